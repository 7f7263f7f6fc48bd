//! Webhook signature verification.
//!
//! The provider signs each callback with HMAC-SHA256 over the raw request
//! body and sends `sha256=<hex digest>` in the `x-hub-signature` header.

use std::str::FromStr;

use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::{error, info, warn};

use crate::error::RelayError;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the webhook signature.
pub const SIGNATURE_HEADER: &str = "x-hub-signature";

/// Tag in front of the hex digest.
pub const SIGNATURE_PREFIX: &str = "sha256=";

/// How to treat a webhook that arrives without a signature header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnsignedWebhookPolicy {
    /// Refuse it as unauthenticated.
    #[default]
    Reject,
    /// Process it unverified and log a warning.
    Accept,
}

impl FromStr for UnsignedWebhookPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reject" => Ok(UnsignedWebhookPolicy::Reject),
            "accept" => Ok(UnsignedWebhookPolicy::Accept),
            other => Err(format!("unknown unsigned webhook policy: {}", other)),
        }
    }
}

/// A raw webhook body that has passed the signature check.
///
/// Only [`verify_request`] can build one, so nothing downstream can act on an
/// unchecked payload.
#[derive(Debug)]
pub struct VerifiedPayload<'a> {
    body: &'a [u8],
    signed: bool,
}

impl<'a> VerifiedPayload<'a> {
    pub fn body(&self) -> &'a [u8] {
        self.body
    }

    /// False when the payload was let through unsigned by policy.
    pub fn is_signed(&self) -> bool {
        self.signed
    }
}

/// Compute the header value the provider would send for `body`.
pub fn sign_payload(secret: &str, body: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC takes keys of any size");
    mac.update(body);
    format!("{}{}", SIGNATURE_PREFIX, hex::encode(mac.finalize().into_bytes()))
}

/// Check a `sha256=<hex>` signature against `body`.
///
/// The digest comparison is constant-time.
pub fn verify_signature(secret: &str, body: &[u8], signature: &str) -> bool {
    let digest_hex = match signature.trim().strip_prefix(SIGNATURE_PREFIX) {
        Some(d) => d,
        None => {
            warn!("webhook_signature_bad_prefix");
            return false;
        }
    };

    let expected = match hex::decode(digest_hex) {
        Ok(bytes) => bytes,
        Err(_) => {
            warn!(signature_length = signature.len(), "webhook_signature_not_hex");
            return false;
        }
    };

    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(m) => m,
        Err(_) => {
            warn!("webhook_signature_invalid_key");
            return false;
        }
    };
    mac.update(body);

    mac.verify_slice(&expected).is_ok()
}

/// Decide whether a webhook request may be processed.
pub fn verify_request<'a>(
    secret: Option<&str>,
    body: &'a [u8],
    signature: Option<&str>,
    policy: UnsignedWebhookPolicy,
) -> Result<VerifiedPayload<'a>, RelayError> {
    let signature = match signature {
        Some(sig) => sig,
        None => {
            return match policy {
                UnsignedWebhookPolicy::Accept => {
                    warn!(header = SIGNATURE_HEADER, "webhook_unsigned_accepted");
                    Ok(VerifiedPayload { body, signed: false })
                }
                UnsignedWebhookPolicy::Reject => {
                    warn!(header = SIGNATURE_HEADER, "webhook_unsigned_rejected");
                    Err(RelayError::Authentication(format!(
                        "missing {} header",
                        SIGNATURE_HEADER
                    )))
                }
            };
        }
    };

    let secret = secret.ok_or_else(|| {
        error!("webhook_secret_not_configured");
        RelayError::Configuration(
            "WEBHOOK_SECRET is not set; signature verification cannot run".to_string(),
        )
    })?;

    if !verify_signature(secret, body, signature) {
        warn!(body_length = body.len(), "webhook_signature_invalid");
        return Err(RelayError::Authentication("signature mismatch".to_string()));
    }

    info!("webhook_signature_verified");
    Ok(VerifiedPayload { body, signed: true })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-webhook-secret";
    const BODY: &[u8] = br#"{"meetingId":"abc","eventType":"Transcription completed"}"#;

    #[test]
    fn test_sign_format() {
        let sig = sign_payload(SECRET, BODY);
        assert!(sig.starts_with("sha256="));
        assert_eq!(sig.len(), SIGNATURE_PREFIX.len() + 64);
    }

    #[test]
    fn test_verify_valid() {
        let sig = sign_payload(SECRET, BODY);
        assert!(verify_signature(SECRET, BODY, &sig));
    }

    #[test]
    fn test_verify_any_body_byte_flip_fails() {
        let sig = sign_payload(SECRET, BODY);
        for i in 0..BODY.len() {
            let mut tampered = BODY.to_vec();
            tampered[i] ^= 0x01;
            assert!(!verify_signature(SECRET, &tampered, &sig), "flip at byte {}", i);
        }
    }

    #[test]
    fn test_verify_any_signature_byte_flip_fails() {
        let sig = sign_payload(SECRET, BODY);
        for i in 0..sig.len() {
            let mut tampered = sig.clone().into_bytes();
            tampered[i] ^= 0x01;
            let tampered = String::from_utf8(tampered).unwrap();
            assert!(!verify_signature(SECRET, BODY, &tampered), "flip at byte {}", i);
        }
    }

    #[test]
    fn test_verify_wrong_secret_fails() {
        let sig = sign_payload("other-secret", BODY);
        assert!(!verify_signature(SECRET, BODY, &sig));
    }

    #[test]
    fn test_verify_without_prefix_fails() {
        let sig = sign_payload(SECRET, BODY);
        let bare = sig.trim_start_matches(SIGNATURE_PREFIX);
        assert!(!verify_signature(SECRET, BODY, bare));
    }

    #[test]
    fn test_verify_truncated_fails() {
        let sig = sign_payload(SECRET, BODY);
        assert!(!verify_signature(SECRET, BODY, &sig[..sig.len() - 2]));
        assert!(!verify_signature(SECRET, BODY, "sha256="));
    }

    #[test]
    fn test_request_signed_ok() {
        let sig = sign_payload(SECRET, BODY);
        let payload = verify_request(Some(SECRET), BODY, Some(&sig), UnsignedWebhookPolicy::Reject).unwrap();
        assert!(payload.is_signed());
        assert_eq!(payload.body(), BODY);
    }

    #[test]
    fn test_request_mismatch_is_authentication_error() {
        let result = verify_request(Some(SECRET), BODY, Some("sha256=00"), UnsignedWebhookPolicy::Accept);
        assert!(matches!(result, Err(RelayError::Authentication(_))));
    }

    #[test]
    fn test_request_signature_without_secret_is_configuration_error() {
        let sig = sign_payload(SECRET, BODY);
        let result = verify_request(None, BODY, Some(&sig), UnsignedWebhookPolicy::Accept);
        assert!(matches!(result, Err(RelayError::Configuration(_))));
    }

    #[test]
    fn test_request_unsigned_rejected_by_default() {
        let result = verify_request(Some(SECRET), BODY, None, UnsignedWebhookPolicy::default());
        assert!(matches!(result, Err(RelayError::Authentication(_))));
    }

    #[test]
    fn test_request_unsigned_accepted_by_policy() {
        let payload = verify_request(Some(SECRET), BODY, None, UnsignedWebhookPolicy::Accept).unwrap();
        assert!(!payload.is_signed());
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!("Accept".parse::<UnsignedWebhookPolicy>(), Ok(UnsignedWebhookPolicy::Accept));
        assert_eq!(" reject ".parse::<UnsignedWebhookPolicy>(), Ok(UnsignedWebhookPolicy::Reject));
        assert!("maybe".parse::<UnsignedWebhookPolicy>().is_err());
    }
}
