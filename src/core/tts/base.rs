//! Base trait and types for batch text-to-speech providers.

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

/// Errors that can occur during speech synthesis.
#[derive(Debug, Error)]
pub enum TtsError {
    /// The HTTP request could not be sent or the connection dropped
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The provider answered with a non-success status
    #[error("Provider returned {status}: {body}")]
    Provider { status: u16, body: String },

    /// Provider credentials are missing
    #[error("API key not configured")]
    MissingCredentials,
}

/// Result type for synthesis operations.
pub type TtsResult<T> = Result<T, TtsError>;

/// A batch text-to-speech provider.
///
/// Returns one complete synthesized audio buffer per call; pacing the buffer
/// out to the caller is the audio pipeline's job, not the provider's.
#[async_trait]
pub trait TextToSpeech: Send + Sync {
    /// Synthesize the given text into a single audio buffer.
    async fn synthesize(&self, text: &str) -> TtsResult<Bytes>;
}
