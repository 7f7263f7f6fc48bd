//! Transcription relay.
//!
//! Forwards media URLs to the Fireflies.ai GraphQL API for transcription and
//! receives the provider's completion webhooks.
//!
//! ## Architecture
//!
//! ```text
//! Caller → POST /transcribe → uploadAudio ─┐
//!                                          ▼
//!                                   Provider (async)
//!                                          │
//! Log ← transcript query ← dispatch ← verify ← POST <webhook path>
//! ```

pub mod config;
pub mod error;
pub mod provider;
pub mod web;
pub mod webhook;

// Re-export commonly used types
pub use config::Config;
pub use error::RelayError;
pub use provider::{FirefliesClient, TranscriptRecord, TranscriptionRequest};
pub use web::{router, AppState};
