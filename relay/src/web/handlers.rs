//! HTTP endpoint handlers.
//!
//! `/transcribe` speaks JSON. The webhook endpoint takes the body as raw
//! bytes because the signature covers the exact bytes sent, and answers in
//! plain text.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info, warn};

use crate::error::RelayError;
use crate::provider::{EnqueueConfirmation, FirefliesClient, TranscriptionRequest};
use crate::webhook::{dispatch, verify_request, DispatchOutcome, SIGNATURE_HEADER};
use crate::Config;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub client: FirefliesClient,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self, RelayError> {
        let client = FirefliesClient::new(&config)?;
        Ok(Self {
            config: Arc::new(config),
            client,
        })
    }
}

// =============================================================================
// Health Check
// =============================================================================

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// Root endpoint, a human-readable liveness message.
pub async fn root() -> &'static str {
    "Transcription relay is running."
}

// =============================================================================
// Transcribe
// =============================================================================

/// `/transcribe` request body.
#[derive(Debug, Deserialize)]
pub struct TranscribeBody {
    #[serde(default, rename = "videoUrl")]
    pub video_url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
}

/// Successful `/transcribe` response.
#[derive(Debug, Serialize)]
pub struct TranscribeAccepted {
    pub message: &'static str,
    pub details: EnqueueConfirmation,
}

/// Error body shared by the JSON endpoints.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

/// Submit a media URL for transcription.
///
/// Responds 202 once the provider has queued the job; the transcript is
/// delivered later through the webhook.
pub async fn transcribe(
    State(state): State<AppState>,
    payload: Result<Json<TranscribeBody>, JsonRejection>,
) -> Result<(StatusCode, Json<TranscribeAccepted>), (StatusCode, Json<ErrorResponse>)> {
    let Json(body) = payload.map_err(|rejection| {
        warn!(error = %rejection, "transcribe_body_invalid");
        transcribe_error(RelayError::Validation(format!(
            "request body must be JSON with a \"videoUrl\" field: {}",
            rejection.body_text()
        )))
    })?;

    let video_url = body
        .video_url
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .ok_or_else(|| {
            warn!("transcribe_missing_video_url");
            transcribe_error(RelayError::Validation(
                "The \"videoUrl\" field is required.".to_string(),
            ))
        })?;

    let callback_url = state.config.callback_url().map_err(|e| {
        error!(error = %e, "transcribe_callback_url_unavailable");
        transcribe_error(e)
    })?;

    let language = body
        .language
        .filter(|l| !l.trim().is_empty())
        .unwrap_or_else(|| state.config.default_language.clone());
    let request = TranscriptionRequest::new(video_url, body.title, language);

    info!(
        video_url = %request.source_media_url,
        callback_url = %callback_url,
        "transcribe_request_received"
    );

    let confirmation = state
        .client
        .submit_transcription(&request, &callback_url)
        .await
        .map_err(|e| {
            error!(error = %e, video_url = %request.source_media_url, "transcribe_submit_failed");
            transcribe_error(e)
        })?;

    info!(video_url = %request.source_media_url, "transcribe_enqueued");

    Ok((
        StatusCode::ACCEPTED,
        Json(TranscribeAccepted {
            message: "Video sent for transcription. Completion will be notified to the configured webhook.",
            details: confirmation,
        }),
    ))
}

fn transcribe_error(err: RelayError) -> (StatusCode, Json<ErrorResponse>) {
    let (status, message) = match &err {
        RelayError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
        RelayError::Configuration(msg) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Server is not configured correctly: {}", msg),
        ),
        e if e.is_upstream() => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Error communicating with the transcription provider.".to_string(),
        ),
        _ => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error while processing /transcribe.".to_string(),
        ),
    };

    (
        status,
        Json(ErrorResponse {
            error: message,
            details: err.details(),
        }),
    )
}

// =============================================================================
// Provider Webhook
// =============================================================================

/// Provider callback endpoint.
///
/// This endpoint:
/// 1. Verifies the HMAC signature over the raw body
/// 2. Fetches the transcript for completion events
/// 3. Returns 200 regardless of the fetch outcome
pub async fn provider_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let signature = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok());

    info!(
        body_length = body.len(),
        has_signature = signature.is_some(),
        content_type = ?headers.get("content-type"),
        "webhook_received"
    );

    let payload = match verify_request(
        state.config.webhook_secret.as_deref(),
        &body,
        signature,
        state.config.unsigned_webhooks,
    ) {
        Ok(p) => p,
        Err(RelayError::Authentication(reason)) => {
            warn!(reason = %reason, "webhook_rejected");
            return (StatusCode::FORBIDDEN, "Invalid signature. Access denied.");
        }
        Err(e) => {
            error!(error = %e, "webhook_verification_error");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error while processing the webhook.",
            );
        }
    };

    match dispatch(&state.client, &payload).await {
        Ok(outcome) => {
            info!(
                outcome = ?outcome,
                fetched = outcome == DispatchOutcome::Fetched,
                "webhook_acknowledged"
            );
            (StatusCode::OK, "Webhook received and processed.")
        }
        Err(e) => {
            error!(error = %e, "webhook_processing_error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error while processing the webhook.",
            )
        }
    }
}
