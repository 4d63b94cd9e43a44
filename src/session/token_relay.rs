//! Token relay: one incremental completion per conversation turn.
//!
//! Chunks are forwarded to the outbound channel the moment they arrive,
//! preserving upstream order exactly; the full reply is accumulated locally
//! so the transcript gains one complete `assistant` turn when the leg ends.
//!
//! Framing invariant: every leg ends in exactly one final chunk, even when
//! the upstream stream fails mid-flight. Only cancellation (connection
//! closed) leaves a leg unterminated, and then nothing may be written to
//! the transport anyway.

use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::core::llm::{ChatCompletionStream, ChatMessage};
use crate::handlers::relay::messages::{FrameRoute, OutboundFrame};

/// Outcome of relaying one turn.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    /// The leg was terminated; `reply` holds the accumulated text
    Completed { reply: String, degraded: bool },
    /// The session went away mid-turn; no terminator was emitted
    Cancelled,
}

/// Drive one completion and relay its chunks outbound.
///
/// Emits a non-final `TextChunk` per upstream chunk in arrival order, then
/// exactly one final terminator. An upstream failure degrades the turn but
/// still terminates the leg so the downstream framing invariant holds.
pub async fn relay_turn(
    llm: &Arc<dyn ChatCompletionStream>,
    messages: Vec<ChatMessage>,
    tx: &mpsc::Sender<FrameRoute>,
    cancel: &CancellationToken,
) -> TurnOutcome {
    let mut upstream = match llm.stream_chat(&messages).await {
        Ok(stream) => stream,
        Err(e) => {
            warn!("Completion request failed: {e}");
            if send_frame(tx, OutboundFrame::leg_terminator()).await.is_err() {
                return TurnOutcome::Cancelled;
            }
            return TurnOutcome::Completed {
                reply: String::new(),
                degraded: true,
            };
        }
    };

    let mut reply = String::new();
    let mut degraded = false;

    loop {
        tokio::select! {
            // Cancellation wins over a ready chunk
            biased;
            _ = cancel.cancelled() => {
                debug!("Completion cancelled mid-turn");
                return TurnOutcome::Cancelled;
            }
            chunk = upstream.next() => {
                match chunk {
                    Some(Ok(token)) => {
                        reply.push_str(&token);
                        let frame = OutboundFrame::TextChunk {
                            token,
                            is_final: false,
                        };
                        if send_frame(tx, frame).await.is_err() {
                            return TurnOutcome::Cancelled;
                        }
                    }
                    Some(Err(e)) => {
                        warn!("Completion stream failed mid-turn: {e}");
                        degraded = true;
                        break;
                    }
                    None => break,
                }
            }
        }
    }

    if send_frame(tx, OutboundFrame::leg_terminator()).await.is_err() {
        return TurnOutcome::Cancelled;
    }

    TurnOutcome::Completed { reply, degraded }
}

async fn send_frame(tx: &mpsc::Sender<FrameRoute>, frame: OutboundFrame) -> Result<(), ()> {
    tx.send(FrameRoute::Frame(frame)).await.map_err(|_| ())
}
