//! Routing of verified webhook payloads.
//!
//! Only one event shape triggers work: a completed transcription with a
//! transcript id. Everything else is acknowledged and dropped.

use serde_json::Value;
use tracing::{error, info, warn};

use super::signature::VerifiedPayload;
use crate::error::RelayError;
use crate::provider::types::id_from_value;
use crate::provider::{FirefliesClient, TranscriptRecord};

/// Event type sent when a transcript is ready.
pub const TRANSCRIPTION_COMPLETED: &str = "Transcription completed";

/// Number of sentences written to the log for a fetched transcript.
const LOGGED_SENTENCES: usize = 5;

/// Callback body sent by the provider.
///
/// Fields of an unexpected type read as absent; the body is untrusted and
/// any shape other than a completion event is simply ignored.
#[derive(Debug, Clone, PartialEq)]
pub struct WebhookEvent {
    pub event_type: Option<String>,
    pub meeting_id: Option<String>,
}

impl WebhookEvent {
    /// Extract the known fields from any JSON value.
    pub fn from_value(value: &Value) -> Self {
        Self {
            event_type: value
                .get("eventType")
                .and_then(Value::as_str)
                .map(str::to_string),
            meeting_id: value.get("meetingId").and_then(id_from_value),
        }
    }

    /// Transcript id to fetch, if this is a recognized completion event.
    pub fn transcript_id(&self) -> Option<&str> {
        if self.event_type.as_deref() != Some(TRANSCRIPTION_COMPLETED) {
            return None;
        }
        self.meeting_id.as_deref().filter(|id| !id.trim().is_empty())
    }
}

/// What the dispatcher did with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Transcript fetched and logged.
    Fetched,
    /// Recognized event, but the follow-up fetch failed.
    FetchFailed,
    /// Unrecognized event or missing id; nothing fetched.
    Ignored,
}

/// Parse a verified body into an event.
///
/// Only bytes that are not JSON at all fail.
pub fn parse_event(payload: &VerifiedPayload<'_>) -> Result<WebhookEvent, RelayError> {
    let value: Value = serde_json::from_slice(payload.body()).map_err(|e| {
        warn!(error = %e, body_length = payload.body().len(), "webhook_payload_malformed");
        RelayError::Parse(e)
    })?;
    Ok(WebhookEvent::from_value(&value))
}

/// Act on a verified webhook.
///
/// Only a parse failure is returned as an error. Fetch failures are logged
/// and reported through [`DispatchOutcome::FetchFailed`] so the caller can
/// still acknowledge receipt.
pub async fn dispatch(
    client: &FirefliesClient,
    payload: &VerifiedPayload<'_>,
) -> Result<DispatchOutcome, RelayError> {
    let event = parse_event(payload)?;

    let transcript_id = match event.transcript_id() {
        Some(id) => id,
        None => {
            info!(
                event_type = ?event.event_type,
                has_meeting_id = event.meeting_id.is_some(),
                "webhook_event_ignored"
            );
            return Ok(DispatchOutcome::Ignored);
        }
    };

    info!(
        transcript_id = %transcript_id,
        signed = payload.is_signed(),
        "webhook_transcription_completed"
    );

    match client.fetch_transcript(transcript_id).await {
        Ok(record) => {
            log_transcript(&record);
            Ok(DispatchOutcome::Fetched)
        }
        Err(e) => {
            error!(transcript_id = %transcript_id, error = %e, "webhook_transcript_fetch_failed");
            Ok(DispatchOutcome::FetchFailed)
        }
    }
}

fn log_transcript(record: &TranscriptRecord) {
    info!(
        transcript_id = %record.id,
        title = ?record.title,
        sentence_count = record.sentences.len(),
        speaker_count = record.speakers.len(),
        "transcript_fetched"
    );

    if record.sentences.is_empty() {
        warn!(transcript_id = %record.id, "transcript_without_sentences");
        return;
    }

    for sentence in record.sentences.iter().take(LOGGED_SENTENCES) {
        info!(
            transcript_id = %record.id,
            speaker = sentence.speaker_name.as_deref().unwrap_or("Speaker"),
            start_time = sentence.start_time,
            text = %sentence.text,
            "transcript_sentence"
        );
    }
}
