//! Web server module.
//!
//! Routes:
//! - `GET /` and `GET /health`: liveness
//! - `POST /transcribe`: enqueue a media URL with the provider
//! - `POST <webhook path>`: provider callback, path taken from configuration

pub mod handlers;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

pub use handlers::{
    health, provider_webhook, root, transcribe, AppState, ErrorResponse, HealthResponse,
    TranscribeAccepted, TranscribeBody,
};

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let webhook_path = state.config.webhook_path.clone();

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/transcribe", post(transcribe))
        .route(&webhook_path, post(provider_webhook))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
