//! Provider module for the Fireflies.ai GraphQL API.
//!
//! ```text
//! /transcribe → submit_transcription() → uploadAudio
//! webhook     → fetch_transcript()     → transcript
//! ```

pub mod client;
pub mod types;

pub use client::FirefliesClient;
pub use types::{
    EnqueueConfirmation, Sentence, Speaker, TranscriptRecord, TranscriptionRequest,
    UploadAudioResult,
};
