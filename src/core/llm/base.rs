//! Base trait and types for streaming chat-completion providers.
//!
//! A provider opens one incremental completion per call and yields text
//! chunks in the order the upstream model produced them. Completions are
//! restartable per call, not across calls: a returned stream is consumed
//! once and dropped.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use serde::Serialize;
use thiserror::Error;

/// Errors that can occur while driving a completion.
#[derive(Debug, Error)]
pub enum LlmError {
    /// The HTTP request could not be sent or the connection dropped
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The provider answered with a non-success status
    #[error("Provider returned {status}: {body}")]
    Provider { status: u16, body: String },

    /// A streamed chunk could not be decoded
    #[error("Malformed stream chunk: {0}")]
    MalformedChunk(String),

    /// Provider credentials are missing
    #[error("API key not configured")]
    MissingCredentials,
}

/// Result type for completion operations.
pub type LlmResult<T> = Result<T, LlmError>;

/// One role/content pair sent to the completion API.
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }
}

/// Incremental completion output: text chunks in upstream arrival order.
pub type TokenStream = Pin<Box<dyn Stream<Item = LlmResult<String>> + Send>>;

/// A streaming chat-completion provider.
///
/// Implementations must be safe for concurrent use by many sessions; all
/// per-call state lives in the returned stream.
#[async_trait]
pub trait ChatCompletionStream: Send + Sync {
    /// Open one incremental completion over the given transcript.
    async fn stream_chat(&self, messages: &[ChatMessage]) -> LlmResult<TokenStream>;
}
