use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use date_labels::app::build_router;
use date_labels::config::Config;
use date_labels::logger::Logger;
use http_body_util::BodyExt;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tower::ServiceExt;

const HOME_PAGE: &str = r#"<!DOCTYPE html>
<html><head><title>Club</title></head><body>
<div class="event-list">
  <div class="event"><div class="event-date" data-date="2024-03-15"><span class="day"></span><span class="month"></span></div></div>
  <div class="event"><div class="event-date" data-date="2024-06-02"><span class="day"></span></div></div>
  <div class="event"><div class="event-date" data-date="2024-07-04"><span class="day"></span><span class="month"></span></div></div>
</div>
<div class="recent-posts">
  <div class="post"><h3>Hello</h3><p class="post-date" data-date="2024-03-15T09:00:00Z">raw</p></div>
</div>
</body></html>"#;

fn router(pairs: &[(&str, &str)]) -> Router {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect();
    let config = Arc::new(Config::from_lookup(|key| vars.get(key).cloned()).expect("config load"));
    build_router(config, Logger::new("date-labels-test")).expect("router")
}

fn label_request(body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/v1/date-labels")
        .header(header::CONTENT_TYPE, "text/html")
        .body(body.into())
        .unwrap()
}

async fn body_string(body: Body) -> String {
    let bytes = body.collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn healthz_is_ok() {
    let response = router(&[])
        .oneshot(
            Request::builder()
                .uri("/healthz")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn aborts_event_pass_at_broken_card_by_default() {
    let response = router(&[]).oneshot(label_request(HOME_PAGE)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "text/html; charset=utf-8"
    );
    assert_eq!(response.headers().get("x-event-dates").unwrap(), "1/3");
    assert_eq!(response.headers().get("x-post-dates").unwrap(), "1/1");
    assert!(response.headers().contains_key("x-request-id"));

    let html = body_string(response.into_body()).await;
    assert!(html.contains(r#"<span class="day">5</span><span class="month">march</span>"#));
    assert!(html.contains(r#"data-date="2024-06-02"><span class="day">0</span></div>"#));
    assert!(html.contains(
        r#"data-date="2024-07-04"><span class="day"></span><span class="month"></span>"#
    ));
    assert!(html.contains(r#"data-date="2024-03-15T09:00:00Z">Fri Mar 15 2024</p>"#));
}

#[tokio::test]
async fn skip_policy_labels_cards_after_a_broken_one() {
    let response = router(&[("DATE_LABELS_ON_MISSING_SLOT", "skip")])
        .oneshot(label_request(HOME_PAGE))
        .await
        .unwrap();

    assert_eq!(response.headers().get("x-event-dates").unwrap(), "2/3");
    let html = body_string(response.into_body()).await;
    assert!(html.contains(
        r#"data-date="2024-07-04"><span class="day">4</span><span class="month">july</span>"#
    ));
}

#[tokio::test]
async fn host_offset_shifts_labels() {
    let response = router(&[("DATE_LABELS_UTC_OFFSET", "-10:00")])
        .oneshot(label_request(HOME_PAGE))
        .await
        .unwrap();

    let html = body_string(response.into_body()).await;
    assert!(html.contains(r#"<span class="day">4</span><span class="month">march</span>"#));
    assert!(html.contains("Thu Mar 14 2024"));
}

#[tokio::test]
async fn token_is_enforced_when_configured() {
    let app = router(&[("DATE_LABELS_TOKEN", "s3cret")]);

    let denied = app.clone().oneshot(label_request(HOME_PAGE)).await.unwrap();
    assert_eq!(denied.status(), StatusCode::UNAUTHORIZED);
    let body: Value = serde_json::from_str(&body_string(denied.into_body()).await).unwrap();
    assert_eq!(body["error"], "Unauthorized");

    let mut request = label_request(HOME_PAGE);
    request
        .headers_mut()
        .insert("x-date-labels-token", "s3cret".parse().unwrap());
    let allowed = app.oneshot(request).await.unwrap();
    assert_eq!(allowed.status(), StatusCode::OK);
}

#[tokio::test]
async fn rejects_non_utf8_bodies() {
    let response = router(&[])
        .oneshot(label_request(vec![0xff, 0xfe, 0x00]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn rejects_oversized_bodies() {
    let oversized = "a".repeat(16 * 1024 + 1);
    let response = router(&[("DATE_LABELS_MAX_HTML_BYTES", "16384")])
        .oneshot(label_request(oversized))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}
