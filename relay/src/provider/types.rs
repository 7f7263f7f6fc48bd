//! Request and response types exchanged with the provider.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

// =============================================================================
// Submission
// =============================================================================

/// A media file to enqueue for transcription.
///
/// Lives only for the duration of one inbound `/transcribe` request.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptionRequest {
    /// Publicly reachable audio or video URL
    pub source_media_url: String,
    /// Title shown in the provider dashboard
    pub title: String,
    /// Spoken language code, e.g. "es" or "en"
    pub language_code: String,
}

impl TranscriptionRequest {
    /// Build a request, deriving the title from the URL basename when absent.
    pub fn new(source_media_url: String, title: Option<String>, language_code: String) -> Self {
        let title = title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| default_title(&source_media_url));

        Self {
            source_media_url,
            title,
            language_code,
        }
    }
}

fn default_title(url: &str) -> String {
    let basename = url.rsplit('/').next().unwrap_or(url);
    format!("Transcription for {}", basename)
}

/// The provider's immediate acknowledgment that a job was accepted.
///
/// Holds the `data` object exactly as received so callers see it verbatim,
/// whatever shape the provider chose.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct EnqueueConfirmation(Value);

impl EnqueueConfirmation {
    pub fn new(data: Value) -> Self {
        Self(data)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// The `uploadAudio` result, if present and object-shaped.
    pub fn upload_audio(&self) -> Option<UploadAudioResult> {
        self.0
            .get("uploadAudio")
            .filter(|v| v.is_object())
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadAudioResult {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

// =============================================================================
// Transcript
// =============================================================================

#[derive(Debug, Deserialize)]
pub(crate) struct TranscriptData {
    pub transcript: Option<TranscriptRecord>,
}

/// A finished transcript as returned by the `transcript` query.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TranscriptRecord {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub sentences: Vec<Sentence>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub speakers: Vec<Speaker>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Sentence {
    #[serde(default, deserialize_with = "null_as_default")]
    pub text: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub start_time: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub end_time: f64,
    #[serde(default)]
    pub speaker_name: Option<String>,
    #[serde(default, deserialize_with = "loose_id")]
    pub speaker_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Speaker {
    #[serde(default, deserialize_with = "loose_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Identifiers arrive as GraphQL `Int` or `ID`; keep them as strings.
fn loose_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Value>::deserialize(deserializer)?.as_ref().and_then(id_from_value))
}

/// String or numeric id as a string; anything else is no id.
pub(crate) fn id_from_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
