//! Transcription relay server.
//!
//! Accepts transcription requests, forwards them to the provider and
//! receives the provider's completion webhooks.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use tokio::{net::TcpListener, signal};
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use relay::{router, AppState, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize structured JSON logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().flatten_event(true))
        .init();

    info!("relay_starting");

    // Load configuration
    let config = Config::from_env();
    info!(
        port = config.port,
        api_url = %config.api_url,
        api_key_configured = config.api_key.is_some(),
        webhook_secret_configured = config.webhook_secret.is_some(),
        server_base_url = ?config.server_base_url,
        webhook_path = %config.webhook_path,
        unsigned_webhooks = ?config.unsigned_webhooks,
        default_language = %config.default_language,
        "config_loaded"
    );

    for warning in config.warnings() {
        warn!(warning = warning, "config_warning");
    }

    let base = config
        .server_base_url
        .clone()
        .unwrap_or_else(|| format!("http://localhost:{}", config.port));
    info!(
        transcribe_endpoint = %format!("{}/transcribe", base),
        webhook_endpoint = %format!("{}{}", base, config.webhook_path),
        "relay_endpoints"
    );

    let port = config.port;
    let state = AppState::new(config).context("Failed to build provider client")?;
    let app = router(state);

    // Bind to address
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!(address = %addr, "relay_listening");

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("relay_shutdown_complete");

    Ok(())
}

/// Create a future that completes when a shutdown signal is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }

    info!("relay_shutting_down");
}
