use bookstore_service::config::BookstoreConfig;
use bookstore_service::services::init_metrics;
use bookstore_service::startup::{shutdown_signal, Application};
use service_core::observability::init_tracing;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let config = BookstoreConfig::load().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        std::io::Error::other(format!("Configuration error: {}", e))
    })?;

    init_tracing(
        "bookstore-service",
        &config.observability.log_level,
        config.observability.otlp_endpoint.as_deref(),
    );

    init_metrics();

    let app = Application::build(config).await.map_err(|e| {
        tracing::error!("Failed to build application: {}", e);
        std::io::Error::other(format!("Startup error: {}", e))
    })?;

    app.run_with_shutdown(shutdown_signal()).await.map_err(|e| {
        tracing::error!("HTTP server error: {}", e);
        e
    })
}
