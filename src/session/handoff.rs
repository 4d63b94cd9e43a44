//! Handoff controller: the ordered terminal sequence of a session.
//!
//! Once scheduling intent fires, the controller sends the configured closing
//! message, waits a configured pause, then logs the call summary (best
//! effort, fire-and-forget) and ends the call. The pause is a pacing choice
//! for the caller's ear, not a correctness constraint.
//!
//! Lifecycle: `Idle -> ClosingMessageSent -> Logged&Ended`, or `Cancelled`
//! from either non-terminal state when the connection closes first. The
//! delayed action is a task tied to the session's cancellation token, never
//! a detached timer.

use std::sync::Arc;
use std::time::Duration;

use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::core::crm::{CallLogger, CallRecord, TranscriptEntry};
use crate::handlers::relay::messages::{FrameRoute, HANDOFF_REASON_CODE, OutboundFrame};

/// Everything the terminal sequence needs, snapshotted at trigger time.
#[derive(Debug, Clone)]
pub struct HandoffContext {
    pub correlation_id: Option<String>,
    pub call_identifier: String,
    pub caller_address: String,
    pub transcript: Vec<TranscriptEntry>,
    pub last_reply_summary: String,
    pub reason: String,
}

/// Send the closing message and schedule the delayed end-of-call action.
///
/// The returned handle is the delayed task; cancelling `cancel` before the
/// delay elapses suppresses both the log call and the end-of-call frame.
pub async fn begin(
    ctx: HandoffContext,
    closing_message: String,
    delay: Duration,
    crm: Option<Arc<dyn CallLogger>>,
    tx: mpsc::Sender<FrameRoute>,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    info!(
        call_identifier = %ctx.call_identifier,
        "Scheduling intent detected, starting handoff"
    );

    // Stage 2: the closing message is its own final chunk, distinct from the
    // model's reply leg.
    let closing = OutboundFrame::TextChunk {
        token: closing_message,
        is_final: true,
    };
    let _ = tx.send(FrameRoute::Frame(closing)).await;

    // Stage 3: delayed log-and-end, cancellable until it fires.
    tokio::spawn(async move {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(
                    call_identifier = %ctx.call_identifier,
                    "Handoff cancelled before completion"
                );
                return;
            }
            _ = tokio::time::sleep(delay) => {}
        }

        if let Some(crm) = crm
            && let Some(correlation_id) = ctx.correlation_id.clone()
        {
            let record = build_record(&ctx, correlation_id);
            // Fire and forget: delivery must never delay the end-of-call frame
            tokio::spawn(async move {
                if let Err(e) = crm.log_call(&record).await {
                    warn!(
                        call_identifier = %record.call_identifier,
                        "Call summary delivery failed: {e}"
                    );
                }
            });
        } else {
            debug!(
                call_identifier = %ctx.call_identifier,
                "No correlation identifier captured, skipping call summary"
            );
        }

        let end = OutboundFrame::EndOfCall {
            reason_code: HANDOFF_REASON_CODE.to_string(),
            reason: ctx.reason.clone(),
        };
        if tx.send(FrameRoute::Frame(end)).await.is_ok() {
            let _ = tx.send(FrameRoute::Close).await;
        }

        info!(call_identifier = %ctx.call_identifier, "Call ended for handoff");
    })
}

fn build_record(ctx: &HandoffContext, correlation_id: String) -> CallRecord {
    let timestamp = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default();
    CallRecord {
        correlation_id,
        call_identifier: ctx.call_identifier.clone(),
        caller_address: ctx.caller_address.clone(),
        timestamp,
        transcript: ctx.transcript.clone(),
        last_reply_summary: ctx.last_reply_summary.clone(),
        handoff_reason: ctx.reason.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    use crate::core::crm::CrmResult;

    struct RecordingLogger {
        records: Mutex<Vec<CallRecord>>,
    }

    impl RecordingLogger {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                records: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl CallLogger for RecordingLogger {
        async fn log_call(&self, record: &CallRecord) -> CrmResult<()> {
            self.records.lock().unwrap().push(record.clone());
            Ok(())
        }
    }

    fn context() -> HandoffContext {
        HandoffContext {
            correlation_id: Some("crm-42".to_string()),
            call_identifier: "CA123".to_string(),
            caller_address: "+15551234".to_string(),
            transcript: Vec::new(),
            last_reply_summary: "happy to schedule".to_string(),
            reason: "caller asked to schedule".to_string(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_closing_message_then_delayed_end() {
        let logger = RecordingLogger::new();
        let (tx, mut rx) = mpsc::channel(16);
        let cancel = CancellationToken::new();

        let handle = begin(
            context(),
            "closing words".to_string(),
            Duration::from_millis(2500),
            Some(logger.clone()),
            tx,
            cancel,
        )
        .await;

        // Closing chunk is immediate and final
        match rx.recv().await {
            Some(FrameRoute::Frame(OutboundFrame::TextChunk { token, is_final })) => {
                assert_eq!(token, "closing words");
                assert!(is_final);
            }
            other => panic!("Expected closing chunk, got {other:?}"),
        }

        handle.await.expect("delayed task should finish");

        match rx.recv().await {
            Some(FrameRoute::Frame(OutboundFrame::EndOfCall { reason_code, .. })) => {
                assert_eq!(reason_code, HANDOFF_REASON_CODE);
            }
            other => panic!("Expected end-of-call, got {other:?}"),
        }
        assert!(matches!(rx.recv().await, Some(FrameRoute::Close)));

        // Logger task is fire-and-forget; yield until it lands
        tokio::task::yield_now().await;
        let records = logger.records.lock().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].correlation_id, "crm-42");
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_suppresses_log_and_end() {
        let logger = RecordingLogger::new();
        let (tx, mut rx) = mpsc::channel(16);
        let cancel = CancellationToken::new();

        let handle = begin(
            context(),
            "closing words".to_string(),
            Duration::from_secs(3),
            Some(logger.clone()),
            tx,
            cancel.clone(),
        )
        .await;

        // Drain the closing chunk, then drop the connection
        let _ = rx.recv().await;
        cancel.cancel();
        handle.await.expect("delayed task should finish");

        assert!(rx.try_recv().is_err(), "no frame may follow cancellation");
        assert!(logger.records.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_correlation_skips_log_but_still_ends() {
        let logger = RecordingLogger::new();
        let (tx, mut rx) = mpsc::channel(16);

        let mut ctx = context();
        ctx.correlation_id = None;

        let handle = begin(
            ctx,
            "closing words".to_string(),
            Duration::from_millis(2500),
            Some(logger.clone()),
            tx,
            CancellationToken::new(),
        )
        .await;

        let _ = rx.recv().await;
        handle.await.expect("delayed task should finish");

        assert!(matches!(
            rx.recv().await,
            Some(FrameRoute::Frame(OutboundFrame::EndOfCall { .. }))
        ));
        assert!(logger.records.lock().unwrap().is_empty());
    }
}
