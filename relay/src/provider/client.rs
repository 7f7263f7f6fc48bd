//! GraphQL client for the transcription provider.
//!
//! Two operations are supported: enqueueing a media URL (`uploadAudio`) and
//! fetching a finished transcript (`transcript`). Both go to the same
//! endpoint with a bearer credential.

use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{error, info, warn};

use super::types::{EnqueueConfirmation, TranscriptData, TranscriptRecord, TranscriptionRequest};
use crate::error::RelayError;
use crate::Config;

const UPLOAD_AUDIO_MUTATION: &str = r#"
mutation($input: AudioUploadInput) {
    uploadAudio(input: $input) {
        success
        title
        message
    }
}
"#;

const TRANSCRIPT_QUERY: &str = r#"
query Transcript($transcriptId: String!) {
    transcript(id: $transcriptId) {
        id
        title
        sentences {
            text
            start_time
            end_time
            speaker_name
            speaker_id
        }
        speakers {
            id
            name
        }
    }
}
"#;

/// Provider API client.
///
/// Cheap to clone; the underlying connection pool is shared.
#[derive(Clone)]
pub struct FirefliesClient {
    http: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl FirefliesClient {
    /// Build a client from the startup configuration.
    pub fn new(config: &Config) -> Result<Self, RelayError> {
        let http = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()?;

        Ok(Self {
            http,
            endpoint: config.api_url.clone(),
            api_key: config.api_key.clone(),
        })
    }

    /// Enqueue a media URL for transcription.
    ///
    /// Returns only the provider's acknowledgment; the transcript itself is
    /// announced later through the webhook at `callback_url`.
    pub async fn submit_transcription(
        &self,
        request: &TranscriptionRequest,
        callback_url: &str,
    ) -> Result<EnqueueConfirmation, RelayError> {
        let variables = json!({
            "input": {
                "url": request.source_media_url,
                "title": request.title,
                "webhook": callback_url,
                "custom_language": request.language_code,
            }
        });

        info!(
            url = %request.source_media_url,
            title = %request.title,
            language = %request.language_code,
            webhook = %callback_url,
            "provider_submit_start"
        );

        let confirmation = EnqueueConfirmation::new(self.execute(UPLOAD_AUDIO_MUTATION, variables).await?);

        match confirmation.upload_audio() {
            Some(result) => info!(
                success = ?result.success,
                message = ?result.message,
                "provider_submit_complete"
            ),
            None => warn!(data = %confirmation.as_value(), "provider_submit_unexpected_shape"),
        }

        Ok(confirmation)
    }

    /// Fetch a finished transcript by the id delivered in the webhook.
    pub async fn fetch_transcript(&self, transcript_id: &str) -> Result<TranscriptRecord, RelayError> {
        info!(transcript_id = %transcript_id, "provider_fetch_transcript_start");

        let data = self
            .execute(TRANSCRIPT_QUERY, json!({ "transcriptId": transcript_id }))
            .await?;
        let data: TranscriptData = decode_data(data)?;

        data.transcript.ok_or_else(|| {
            RelayError::Provider(json!([{
                "message": format!("transcript {} not found", transcript_id)
            }]))
        })
    }

    /// Send one GraphQL operation and return its `data` object.
    async fn execute(&self, query: &str, variables: Value) -> Result<Value, RelayError> {
        // Checked before any I/O so a misconfigured relay never hits the network.
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            error!("provider_api_key_missing");
            RelayError::Configuration("FIREFLIES_API_KEY is not set".to_string())
        })?;

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    error!(error = %e, "provider_request_timeout");
                } else {
                    error!(error = %e, "provider_request_error");
                }
                RelayError::Transport(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let body = serde_json::from_str(&text).unwrap_or(Value::String(text));
            error!(status_code = status.as_u16(), body = %body, "provider_http_error");
            return Err(RelayError::UpstreamStatus {
                status: status.as_u16(),
                body,
            });
        }

        let text = response.text().await?;
        let envelope: Value = serde_json::from_str(&text).map_err(|e| {
            error!(error = %e, body_length = text.len(), "provider_response_not_json");
            RelayError::Provider(json!({
                "message": "response body is not JSON",
                "body": text,
            }))
        })?;

        // GraphQL reports failures with HTTP 200; the body decides.
        match envelope.get("errors") {
            None | Some(Value::Null) => {}
            Some(Value::Array(errors)) if errors.is_empty() => {}
            Some(errors) => {
                error!(errors = %errors, "provider_graphql_errors");
                return Err(RelayError::Provider(errors.clone()));
            }
        }

        match envelope.get("data") {
            Some(data) if !data.is_null() => Ok(data.clone()),
            _ => {
                error!(body = %envelope, "provider_response_without_data");
                Err(RelayError::Provider(json!({
                    "message": "response contained no data",
                    "body": envelope,
                })))
            }
        }
    }
}

/// Decode a `data` object, reporting shape mismatches as provider errors.
fn decode_data<T: DeserializeOwned>(data: Value) -> Result<T, RelayError> {
    serde_json::from_value(data.clone()).map_err(|e| {
        error!(error = %e, "provider_response_unexpected_shape");
        RelayError::Provider(json!({
            "message": format!("unexpected response shape: {}", e),
            "data": data,
        }))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::webhook::UnsignedWebhookPolicy;
    use mockito::{Matcher, Server};

    fn config(api_url: String, api_key: Option<&str>) -> Config {
        Config {
            port: 0,
            api_key: api_key.map(str::to_string),
            api_url,
            webhook_secret: None,
            server_base_url: Some("https://relay.example.com".to_string()),
            webhook_path: "/fireflies-webhook".to_string(),
            unsigned_webhooks: UnsignedWebhookPolicy::Reject,
            default_language: "es".to_string(),
            request_timeout_ms: 5_000,
        }
    }

    fn request() -> TranscriptionRequest {
        TranscriptionRequest::new("https://x/video.mp4".to_string(), None, "es".to_string())
    }

    #[tokio::test]
    async fn test_submit_sends_mutation_with_bearer() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/graphql")
            .match_header("authorization", "Bearer test-key")
            .match_body(Matcher::PartialJson(json!({
                "variables": {
                    "input": {
                        "url": "https://x/video.mp4",
                        "title": "Transcription for video.mp4",
                        "webhook": "https://relay.example.com/fireflies-webhook",
                        "custom_language": "es"
                    }
                }
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "data": { "uploadAudio": { "success": true, "title": "t", "message": "queued" } }
                })
                .to_string(),
            )
            .expect(1)
            .create_async()
            .await;

        let client = FirefliesClient::new(&config(format!("{}/graphql", server.url()), Some("test-key"))).unwrap();
        let confirmation = client
            .submit_transcription(&request(), "https://relay.example.com/fireflies-webhook")
            .await
            .unwrap();

        let result = confirmation.upload_audio().unwrap();
        assert_eq!(result.success, Some(true));
        assert_eq!(result.message.as_deref(), Some("queued"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_missing_api_key_fails_before_network() {
        let mut server = Server::new_async().await;
        let mock = server.mock("POST", "/graphql").expect(0).create_async().await;

        let client = FirefliesClient::new(&config(format!("{}/graphql", server.url()), None)).unwrap();
        let result = client.fetch_transcript("abc").await;

        assert!(matches!(result, Err(RelayError::Configuration(_))));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_graphql_errors_with_http_200_fail() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/graphql")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "data": null,
                    "errors": [{ "message": "Cannot query field", "code": "GRAPHQL_VALIDATION_FAILED" }]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = FirefliesClient::new(&config(format!("{}/graphql", server.url()), Some("k"))).unwrap();
        let err = client
            .submit_transcription(&request(), "https://relay.example.com/fireflies-webhook")
            .await
            .unwrap_err();

        match err {
            RelayError::Provider(errors) => {
                assert_eq!(errors[0]["code"], json!("GRAPHQL_VALIDATION_FAILED"));
            }
            other => panic!("Expected provider error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_http_error_keeps_body() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/graphql")
            .with_status(401)
            .with_header("content-type", "application/json")
            .with_body(json!({ "message": "invalid api key" }).to_string())
            .create_async()
            .await;

        let client = FirefliesClient::new(&config(format!("{}/graphql", server.url()), Some("k"))).unwrap();
        let err = client.fetch_transcript("abc").await.unwrap_err();

        match err {
            RelayError::UpstreamStatus { status, body } => {
                assert_eq!(status, 401);
                assert_eq!(body["message"], json!("invalid api key"));
            }
            other => panic!("Expected upstream status error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fetch_transcript() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/graphql")
            .match_body(Matcher::PartialJson(json!({ "variables": { "transcriptId": "abc" } })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "data": {
                        "transcript": {
                            "id": "abc",
                            "title": "Standup",
                            "sentences": [
                                { "text": "Hola", "start_time": 0.0, "end_time": 1.0, "speaker_name": "Ana", "speaker_id": 0 }
                            ],
                            "speakers": [{ "id": "0", "name": "Ana" }]
                        }
                    }
                })
                .to_string(),
            )
            .expect(1)
            .create_async()
            .await;

        let client = FirefliesClient::new(&config(format!("{}/graphql", server.url()), Some("k"))).unwrap();
        let record = client.fetch_transcript("abc").await.unwrap();

        assert_eq!(record.title.as_deref(), Some("Standup"));
        assert_eq!(record.sentences.len(), 1);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_null_transcript_is_provider_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/graphql")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!({ "data": { "transcript": null } }).to_string())
            .create_async()
            .await;

        let client = FirefliesClient::new(&config(format!("{}/graphql", server.url()), Some("k"))).unwrap();
        let result = client.fetch_transcript("missing").await;

        assert!(matches!(result, Err(RelayError::Provider(_))));
    }

    #[tokio::test]
    async fn test_submit_null_upload_audio_is_mirrored() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/graphql")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!({ "data": { "uploadAudio": null } }).to_string())
            .create_async()
            .await;

        let client = FirefliesClient::new(&config(format!("{}/graphql", server.url()), Some("k"))).unwrap();
        let confirmation = client
            .submit_transcription(&request(), "https://relay.example.com/fireflies-webhook")
            .await
            .unwrap();

        assert!(confirmation.upload_audio().is_none());
        assert_eq!(confirmation.as_value(), &json!({ "uploadAudio": null }));
    }

    #[tokio::test]
    async fn test_non_json_body_is_provider_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/graphql")
            .with_status(200)
            .with_body("<html>maintenance</html>")
            .create_async()
            .await;

        let client = FirefliesClient::new(&config(format!("{}/graphql", server.url()), Some("k"))).unwrap();
        let err = client.fetch_transcript("abc").await.unwrap_err();

        match err {
            RelayError::Provider(detail) => {
                assert_eq!(detail["body"], json!("<html>maintenance</html>"));
            }
            other => panic!("Expected provider error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_transcript_shape_mismatch_is_provider_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/graphql")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!({ "data": { "transcript": { "id": "abc", "sentences": "oops" } } }).to_string())
            .create_async()
            .await;

        let client = FirefliesClient::new(&config(format!("{}/graphql", server.url()), Some("k"))).unwrap();
        let err = client.fetch_transcript("abc").await.unwrap_err();

        match err {
            RelayError::Provider(detail) => {
                assert_eq!(detail["data"]["transcript"]["sentences"], json!("oops"));
            }
            other => panic!("Expected provider error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_transport_error() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };

        let client = FirefliesClient::new(&config(format!("http://127.0.0.1:{}/graphql", port), Some("k"))).unwrap();
        let result = client.fetch_transcript("abc").await;

        assert!(matches!(result, Err(RelayError::Transport(_))));
    }
}
