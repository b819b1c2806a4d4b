// Forbid unwrap() in production code to prevent panics on bad configuration.
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
use std::net::SocketAddr;
use std::sync::Arc;

use appauth::{
    auth::{ApplicationRegistry, AuthorizationResolver, TokenIssuer},
    config::{ServerConfig, ServiceConfig},
    http::create_router,
    logging,
};

/// Report a fatal startup or serve error and exit.
///
/// Falls back to stdout logging if the subscriber isn't installed yet.
fn fail_startup(message: &str) -> ! {
    logging::ensure_default();
    tracing::error!("{message}");
    std::process::exit(1);
}

#[tokio::main]
async fn main() {
    // Load configuration from environment variables
    let config = ServerConfig::from_env()
        .unwrap_or_else(|e| fail_startup(&format!("Failed to load configuration: {e}")));

    let service = ServiceConfig::load(&config.config_file)
        .unwrap_or_else(|e| fail_startup(&format!("Failed to load service file: {e}")));

    if let Err(e) = logging::init(service.log_file.as_deref()) {
        fail_startup(&format!("Failed to open log file: {e}"));
    }

    // The registry is built once and never mutated; handlers share it read-only.
    let registry = ApplicationRegistry::from_config(&service)
        .map(Arc::new)
        .unwrap_or_else(|e| fail_startup(&format!("Invalid application configuration: {e}")));

    tracing::info!(
        "Loaded configuration: config_file={}, applications={}, token_validity_hours={}",
        config.config_file.display(),
        registry.len(),
        service.token_validity_hours
    );

    let issuer = TokenIssuer::new(
        registry,
        AuthorizationResolver::new(service.auth_source_timeout()),
        service.token_validity(),
    );
    let app = create_router(Arc::new(issuer));

    let addr = SocketAddr::new(config.listen_address, config.listen_port);
    tracing::info!("listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .unwrap_or_else(|e| fail_startup(&format!("Failed to bind: {e}")));

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap_or_else(|e| fail_startup(&format!("Server error: {e}")));
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
