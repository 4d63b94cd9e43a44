//! Base trait and types for batch speech-to-text providers.

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

/// Errors that can occur during transcription.
#[derive(Debug, Error)]
pub enum SttError {
    /// The HTTP request could not be sent or the connection dropped
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The provider answered with a non-success status
    #[error("Provider returned {status}: {body}")]
    Provider { status: u16, body: String },

    /// The audio clip could not be encoded for upload
    #[error("Audio encoding failed: {0}")]
    Encoding(String),

    /// The provider response did not contain a transcript
    #[error("Malformed transcription response: {0}")]
    MalformedResponse(String),

    /// Provider credentials are missing
    #[error("API key not configured")]
    MissingCredentials,
}

/// Result type for transcription operations.
pub type SttResult<T> = Result<T, SttError>;

/// A batch speech-to-text provider.
///
/// Takes one complete linear PCM clip (16-bit signed little-endian, mono)
/// and returns the transcribed text. Safe for concurrent use across sessions.
#[async_trait]
pub trait SpeechToText: Send + Sync {
    /// Transcribe a complete audio clip.
    async fn transcribe(&self, clip: Bytes, sample_rate: u32) -> SttResult<String>;
}
