use crate::config::Config;
use crate::formatter::DateLabeler;
use crate::logger::Logger;
use crate::page::{LabelledPage, label_page};
use axum::Router;
use axum::body::{Body, Bytes};
use axum::extract::{DefaultBodyLimit, State};
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use uuid::Uuid;

const TOKEN_HEADER: &str = "x-date-labels-token";

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub labeler: Arc<DateLabeler>,
    pub logger: Logger,
    pub semaphore: Arc<Semaphore>,
}

#[derive(Debug)]
pub enum LabelRequestError {
    Unauthorized,
    BadRequest(String),
    Unavailable(String),
}

impl LabelRequestError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            LabelRequestError::Unauthorized => StatusCode::UNAUTHORIZED,
            LabelRequestError::BadRequest(_) => StatusCode::BAD_REQUEST,
            LabelRequestError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    pub fn detail(&self) -> &str {
        match self {
            LabelRequestError::Unauthorized => "Unauthorized",
            LabelRequestError::BadRequest(message) | LabelRequestError::Unavailable(message) => {
                message.as_str()
            }
        }
    }
}

pub fn build_router(config: Arc<Config>, logger: Logger) -> anyhow::Result<Router> {
    let labeler = DateLabeler::new(config.host_offset, config.on_missing_slot)?;
    let body_limit = config.max_html_bytes;
    let state = Arc::new(AppState {
        semaphore: Arc::new(Semaphore::new(config.max_concurrency)),
        labeler: Arc::new(labeler),
        config,
        logger,
    });

    Ok(Router::new()
        .route("/healthz", get(handle_healthz))
        .route("/v1/date-labels", post(handle_date_labels))
        .with_state(state)
        .layer(DefaultBodyLimit::max(body_limit)))
}

async fn handle_healthz() -> impl IntoResponse {
    StatusCode::OK
}

async fn handle_date_labels(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    uri: Uri,
    body: Bytes,
) -> Response<Body> {
    let request_id = resolve_request_id(&headers);
    let started_at = Instant::now();
    state.logger.info(
        "request.received",
        json!({
            "requestId": request_id,
            "method": Method::POST.as_str(),
            "rawUrl": uri.to_string(),
            "bytes": body.len(),
        }),
    );

    let response = match relabel(&state, &headers, body).await {
        Ok(page) => html_response(page, request_id.as_str()),
        Err(error) => json_error(error.status_code(), error.detail(), request_id.as_str()),
    };

    let duration_ms = started_at.elapsed().as_secs_f64() * 1000.0;
    state.logger.info(
        "request.completed",
        json!({
            "requestId": request_id,
            "method": Method::POST.as_str(),
            "rawUrl": uri.to_string(),
            "statusCode": response.status().as_u16(),
            "durationMs": duration_ms,
        }),
    );
    response
}

async fn relabel(
    state: &Arc<AppState>,
    headers: &HeaderMap,
    body: Bytes,
) -> Result<LabelledPage, LabelRequestError> {
    if let Some(expected) = state.config.token.as_deref()
        && !is_authorized(headers, expected)
    {
        return Err(LabelRequestError::Unauthorized);
    }

    let html = String::from_utf8(body.to_vec())
        .map_err(|_| LabelRequestError::BadRequest("Body must be UTF-8 HTML".into()))?;

    let permit = state
        .semaphore
        .clone()
        .acquire_owned()
        .await
        .map_err(|_| LabelRequestError::Unavailable("Service shutting down".into()))?;

    let labeler = state.labeler.clone();
    let logger = state.logger.clone();
    let page = tokio::task::spawn_blocking(move || label_page(&labeler, &html, &logger))
        .await
        .map_err(|_| LabelRequestError::Unavailable("Labelling task failed".into()));
    drop(permit);
    page
}

fn html_response(page: LabelledPage, request_id: &str) -> Response<Body> {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/html; charset=utf-8"),
    );
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    insert_header(&mut headers, "x-request-id", request_id);
    insert_header(&mut headers, "x-event-dates", &page.report.events.ratio());
    insert_header(&mut headers, "x-post-dates", &page.report.posts.ratio());
    (StatusCode::OK, headers, page.html).into_response()
}

fn insert_header(headers: &mut HeaderMap, name: &'static str, value: &str) {
    headers.insert(
        HeaderName::from_static(name),
        HeaderValue::from_str(value).unwrap_or_else(|_| HeaderValue::from_static("")),
    );
}

fn resolve_request_id(headers: &HeaderMap) -> String {
    headers
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.trim().is_empty())
        .map(|value| value.to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

fn is_authorized(headers: &HeaderMap, expected: &str) -> bool {
    let provided = headers
        .get(TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("");
    constant_time_eq(provided.as_bytes(), expected.as_bytes())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (&x, &y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

fn json_error(status: StatusCode, message: &str, request_id: &str) -> Response<Body> {
    let body = json!({ "error": message }).to_string();
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    insert_header(&mut headers, "x-request-id", request_id);
    (status, headers, body).into_response()
}
