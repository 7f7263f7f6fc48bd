//! Inbound webhook handling.
//!
//! ```text
//! raw bytes → verify_request() → VerifiedPayload → dispatch() → fetch_transcript()
//! ```

pub mod dispatch;
pub mod signature;

pub use dispatch::{dispatch, parse_event, DispatchOutcome, WebhookEvent, TRANSCRIPTION_COMPLETED};
pub use signature::{
    sign_payload, verify_request, verify_signature, UnsignedWebhookPolicy, VerifiedPayload,
    SIGNATURE_HEADER, SIGNATURE_PREFIX,
};
