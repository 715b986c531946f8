use anyhow::Result;
use date_labels::app::build_router;
use date_labels::config::Config;
use date_labels::logger::Logger;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;

#[tokio::main]
async fn main() -> Result<()> {
    let logger = Logger::new("date-labels");
    let config = Arc::new(Config::load()?);
    let router = build_router(config.clone(), logger.clone())?;

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    logger.info(
        "server.starting",
        serde_json::json!({
            "port": config.port,
            "hostOffset": config.host_offset.to_string(),
            "onMissingSlot": config.on_missing_slot,
            "tokenRequired": config.token.is_some(),
        }),
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    logger.info("server.stopped", serde_json::json!({}));
    Ok(())
}

async fn shutdown_signal() {
    let _ = signal::ctrl_c().await;
}
