//! Base trait and types for the out-of-band call-control collaborator.
//!
//! Some telephony channels cannot take in-band streamed text; for those the
//! completed reply is pushed through the signaling provider's call-update
//! API instead.

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur while updating a live call.
#[derive(Debug, Error)]
pub enum CallControlError {
    /// The HTTP request could not be sent or the connection dropped
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The provider answered with a non-success status
    #[error("Provider returned {status}: {body}")]
    Provider { status: u16, body: String },
}

/// Result type for call-control operations.
pub type CallControlResult<T> = Result<T, CallControlError>;

/// Updates a live call's spoken response out of band.
#[async_trait]
pub trait CallControl: Send + Sync {
    /// Replace the call's spoken response with the given reply text.
    async fn update_reply(&self, call_identifier: &str, text: &str) -> CallControlResult<()>;
}
