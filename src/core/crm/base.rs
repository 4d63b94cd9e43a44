//! Base trait and types for the CRM/logging collaborator.
//!
//! The gateway pushes one structured summary per handed-off call. The call
//! is best-effort: failure is logged by the caller and never blocks the
//! end-of-call sequence.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

/// Errors that can occur while delivering a call summary.
#[derive(Debug, Error)]
pub enum CrmError {
    /// The HTTP request could not be sent or the connection dropped
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The collaborator answered with a non-success status
    #[error("Collaborator returned {status}: {body}")]
    Collaborator { status: u16, body: String },
}

/// Result type for CRM operations.
pub type CrmResult<T> = Result<T, CrmError>;

/// One transcript turn as delivered to the CRM.
#[derive(Debug, Clone, Serialize)]
pub struct TranscriptEntry {
    pub role: String,
    pub content: String,
}

/// Structured summary of one handed-off call.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallRecord {
    /// External record reference captured at connect time
    pub correlation_id: String,
    pub call_identifier: String,
    pub caller_address: String,
    /// RFC 3339 timestamp of the handoff
    pub timestamp: String,
    pub transcript: Vec<TranscriptEntry>,
    pub last_reply_summary: String,
    pub handoff_reason: String,
}

/// Accepts one structured call summary per handoff.
///
/// Implementations must be safe for concurrent use by many sessions.
#[async_trait]
pub trait CallLogger: Send + Sync {
    /// Deliver the call summary via a one-shot network call.
    async fn log_call(&self, record: &CallRecord) -> CrmResult<()>;
}
