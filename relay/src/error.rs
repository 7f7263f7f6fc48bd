//! Error taxonomy shared by the GraphQL client, the webhook path and the
//! HTTP handlers.

use serde_json::Value;
use thiserror::Error;

/// Every failure the relay can surface.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Missing credential, secret or base URL.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A required input field was missing or empty.
    #[error("validation error: {0}")]
    Validation(String),

    /// The webhook signature was absent (under the reject policy) or wrong.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// The provider could not be reached.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The provider answered with a non-success HTTP status.
    #[error("provider responded with HTTP {status}")]
    UpstreamStatus { status: u16, body: Value },

    /// The provider answered 200 but reported GraphQL-level errors.
    #[error("provider returned errors: {0}")]
    Provider(Value),

    /// The webhook body was not valid JSON for the expected shape.
    #[error("malformed webhook payload: {0}")]
    Parse(#[from] serde_json::Error),
}

impl RelayError {
    /// Structured detail worth echoing back to an API caller, if any.
    pub fn details(&self) -> Option<Value> {
        match self {
            RelayError::UpstreamStatus { body, .. } => Some(body.clone()),
            RelayError::Provider(errors) => Some(errors.clone()),
            RelayError::Transport(e) => Some(Value::String(e.to_string())),
            _ => None,
        }
    }

    /// Whether the failure came from talking to the provider.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            RelayError::Transport(_) | RelayError::UpstreamStatus { .. } | RelayError::Provider(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_details_for_provider_errors() {
        let err = RelayError::Provider(json!([{ "message": "bad input" }]));
        assert_eq!(err.details(), Some(json!([{ "message": "bad input" }])));
        assert!(err.is_upstream());
    }

    #[test]
    fn test_details_for_upstream_status() {
        let err = RelayError::UpstreamStatus {
            status: 401,
            body: json!({ "error": "unauthorized" }),
        };
        assert_eq!(err.to_string(), "provider responded with HTTP 401");
        assert_eq!(err.details(), Some(json!({ "error": "unauthorized" })));
    }

    #[test]
    fn test_local_errors_have_no_details() {
        assert!(RelayError::Validation("videoUrl".into()).details().is_none());
        assert!(RelayError::Configuration("x".into()).details().is_none());
        assert!(!RelayError::Authentication("x".into()).is_upstream());
    }
}
