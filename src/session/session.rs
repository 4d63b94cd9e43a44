//! Per-connection conversation session.
//!
//! One session owns one connection's state for exactly the connection's
//! lifetime. Inbound frames are dispatched here; everything that suspends
//! for a while (completions, transcription, paced playback) runs in spawned
//! tasks so the receive loop can keep observing the connection, while a
//! per-session turn gate keeps at most one completion in flight and the
//! transcript mutation single-threaded.

use std::sync::Arc;

use tokio::sync::{Mutex, RwLock, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::handlers::relay::messages::{FrameRoute, InboundFrame};
use crate::session::audio::{self, AudioBuffer};
use crate::session::handoff::{self, HandoffContext};
use crate::session::token_relay::{TurnOutcome, relay_turn};
use crate::session::transcript::{Transcript, Turn};
use crate::state::AppState;

/// Mutable session state, guarded by the handle's lock.
struct SessionState {
    call_identifier: Option<String>,
    caller_address: Option<String>,
    transcript: Transcript,
    last_reply_summary: String,
    handoff_triggered: bool,
    active: bool,
    audio: AudioBuffer,
}

/// Read-only view of session state for tests and diagnostics.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub call_identifier: Option<String>,
    pub caller_address: Option<String>,
    pub turns: Vec<Turn>,
    pub last_reply_summary: String,
    pub handoff_triggered: bool,
    pub active: bool,
}

/// Handle to one live session.
///
/// Cheap to clone; spawned turn tasks carry a clone and share the same
/// state, outbound channel and cancellation token.
#[derive(Clone)]
pub struct SessionHandle {
    session_id: String,
    correlation_id: Option<String>,
    app: Arc<AppState>,
    state: Arc<RwLock<SessionState>>,
    tx: mpsc::Sender<FrameRoute>,
    cancel: CancellationToken,
    /// One in-flight completion per session; waiters are served in FIFO order
    turn_gate: Arc<Mutex<()>>,
}

impl SessionHandle {
    /// Create the session for a freshly opened connection.
    pub fn new(
        app: Arc<AppState>,
        correlation_id: Option<String>,
        tx: mpsc::Sender<FrameRoute>,
    ) -> Self {
        let transcript = Transcript::new(app.config.agent.system_prompt.clone());
        Self {
            session_id: Uuid::new_v4().to_string(),
            correlation_id,
            app,
            state: Arc::new(RwLock::new(SessionState {
                call_identifier: None,
                caller_address: None,
                transcript,
                last_reply_summary: String::new(),
                handoff_triggered: false,
                active: true,
                audio: AudioBuffer::new(),
            })),
            tx,
            cancel: CancellationToken::new(),
            turn_gate: Arc::new(Mutex::new(())),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn correlation_id(&self) -> Option<&str> {
        self.correlation_id.as_deref()
    }

    /// Dispatch one inbound frame. Frames for the same session are handed in
    /// receipt order by the connection's receive loop.
    pub async fn on_frame(&self, frame: InboundFrame) {
        match frame {
            InboundFrame::Setup {
                call_identifier,
                caller_address,
            } => {
                let mut state = self.state.write().await;
                if state.call_identifier.is_some() {
                    // First write wins
                    warn!(
                        session_id = %self.session_id,
                        "Duplicate setup frame ignored"
                    );
                    return;
                }
                info!(
                    session_id = %self.session_id,
                    call_identifier = %call_identifier,
                    caller_address = %caller_address,
                    "Call setup"
                );
                state.call_identifier = Some(call_identifier);
                state.caller_address = Some(caller_address);
            }
            InboundFrame::Prompt { utterance } => {
                self.spawn_turn(utterance);
            }
            InboundFrame::Media { payload } => {
                if !self.app.config.agent.audio_enabled {
                    debug!(session_id = %self.session_id, "Audio pipeline inactive, dropping media frame");
                    return;
                }
                let mut state = self.state.write().await;
                if state.active {
                    state.audio.push(payload);
                }
            }
            InboundFrame::Stop => {
                if !self.app.config.agent.audio_enabled {
                    debug!(session_id = %self.session_id, "Audio pipeline inactive, ignoring stop frame");
                    return;
                }
                let clip = {
                    let mut state = self.state.write().await;
                    if state.audio.is_empty() {
                        debug!(session_id = %self.session_id, "Stop with empty audio buffer");
                        return;
                    }
                    state.audio.take_clip()
                };

                let session = self.clone();
                tokio::spawn(async move {
                    let sample_rate = session.app.config.agent.audio_sample_rate;
                    match session.app.stt.transcribe(clip, sample_rate).await {
                        Ok(text) if !text.is_empty() => session.run_turn(text).await,
                        Ok(_) => {
                            debug!(session_id = %session.session_id, "Empty transcription, no turn");
                        }
                        Err(e) => {
                            warn!(session_id = %session.session_id, "Transcription failed: {e}");
                        }
                    }
                });
            }
        }
    }

    /// Tear the session down: no further frames may be produced, in-flight
    /// work is cancelled, buffered audio is discarded.
    pub async fn on_close(&self) {
        {
            let mut state = self.state.write().await;
            state.active = false;
            state.audio.discard();
        }
        self.cancel.cancel();
        info!(session_id = %self.session_id, "Session closed");
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let state = self.state.read().await;
        SessionSnapshot {
            call_identifier: state.call_identifier.clone(),
            caller_address: state.caller_address.clone(),
            turns: state.transcript.turns().to_vec(),
            last_reply_summary: state.last_reply_summary.clone(),
            handoff_triggered: state.handoff_triggered,
            active: state.active,
        }
    }

    fn spawn_turn(&self, utterance: String) {
        let session = self.clone();
        tokio::spawn(async move {
            session.run_turn(utterance).await;
        });
    }

    /// Run one complete conversation turn for a caller utterance.
    async fn run_turn(&self, utterance: String) {
        let _turn = self.turn_gate.lock().await;
        if self.cancel.is_cancelled() {
            return;
        }

        let messages = {
            let mut state = self.state.write().await;
            if !state.active {
                return;
            }
            state.transcript.push_user(utterance.clone());
            state.transcript.to_chat_messages()
        };

        let outcome = relay_turn(&self.app.llm, messages, &self.tx, &self.cancel).await;
        let (reply, degraded) = match outcome {
            TurnOutcome::Completed { reply, degraded } => (reply, degraded),
            TurnOutcome::Cancelled => return,
        };
        if degraded {
            warn!(session_id = %self.session_id, "Turn degraded by upstream failure");
        }

        let agent = &self.app.config.agent;
        let handoff_ctx = {
            let mut state = self.state.write().await;
            state.transcript.push_assistant(reply.clone());
            state.last_reply_summary = reply.clone();

            let intent = self.app.intent.detect(&utterance)
                || (agent.scan_reply && self.app.intent.detect(&reply));
            if intent && !state.handoff_triggered && state.active {
                state.handoff_triggered = true;
                Some(HandoffContext {
                    correlation_id: self.correlation_id.clone(),
                    call_identifier: state.call_identifier.clone().unwrap_or_default(),
                    caller_address: state.caller_address.clone().unwrap_or_default(),
                    transcript: state.transcript.to_crm_entries(),
                    last_reply_summary: state.last_reply_summary.clone(),
                    reason: format!("Scheduling intent detected in: {utterance}"),
                })
            } else {
                None
            }
        };

        if let Some(ctx) = handoff_ctx {
            // Detached; teardown goes through the session cancellation token
            let _ = handoff::begin(
                ctx,
                agent.closing_message.clone(),
                agent.handoff_delay,
                self.app.crm.clone(),
                self.tx.clone(),
                self.cancel.clone(),
            )
            .await;
            return;
        }

        if reply.is_empty() {
            return;
        }

        self.deliver_out_of_band(&reply).await;

        if agent.audio_enabled {
            match self.app.tts.synthesize(&reply).await {
                Ok(clip) => {
                    audio::stream_playback(
                        clip,
                        agent.playback_chunk_bytes,
                        agent.playback_interval,
                        &self.tx,
                        &self.cancel,
                    )
                    .await;
                }
                Err(e) => {
                    warn!(session_id = %self.session_id, "Speech synthesis failed: {e}");
                }
            }
        }
    }

    /// Push the completed reply through the call-control collaborator when
    /// the channel is configured for out-of-band replies.
    async fn deliver_out_of_band(&self, reply: &str) {
        if !self.app.config.agent.reply_via_call_update {
            return;
        }
        let Some(call_control) = self.app.call_control.clone() else {
            return;
        };
        let Some(call_identifier) = self.state.read().await.call_identifier.clone() else {
            debug!(session_id = %self.session_id, "No call identifier yet, skipping call update");
            return;
        };

        let reply = reply.to_string();
        let session_id = self.session_id.clone();
        // Best effort; the in-band leg already terminated
        tokio::spawn(async move {
            if let Err(e) = call_control.update_reply(&call_identifier, &reply).await {
                warn!(session_id = %session_id, "Call update failed: {e}");
            }
        });
    }
}
