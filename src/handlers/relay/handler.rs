//! Conversation relay WebSocket handler
//!
//! This is the connection listener: it upgrades the HTTP request, owns the
//! per-connection session for its lifetime, routes inbound frames to the
//! session in receipt order, and forwards outbound frames to the socket
//! through a single sender task.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::{select, time::Duration};
use tracing::{debug, error, info, warn};

use crate::session::SessionHandle;
use crate::state::AppState;

use super::messages::{FrameError, FrameRoute, InboundFrame};

/// Outbound channel depth per connection
const CHANNEL_BUFFER_SIZE: usize = 256;

/// Maximum WebSocket frame size (1 MB)
const MAX_WS_FRAME_SIZE: usize = 1024 * 1024;

/// Maximum WebSocket message size (1 MB)
const MAX_WS_MESSAGE_SIZE: usize = 1024 * 1024;

/// How often the receive loop checks for a stale connection
const IDLE_SWEEP_INTERVAL: Duration = Duration::from_secs(30);

/// Maximum idle time before closing the connection
const IDLE_TIMEOUT: Duration = Duration::from_secs(300);

/// Conversation relay WebSocket handler
///
/// Upgrades the HTTP connection and hands the socket to the per-connection
/// session loop. An optional `correlation_id` query parameter is captured
/// once here and attached to the session for handoff logging.
pub async fn relay_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<HashMap<String, String>>,
    State(state): State<Arc<AppState>>,
) -> Response {
    let correlation_id = params.get("correlation_id").cloned();
    info!(
        correlation_id = ?correlation_id,
        "Relay WebSocket connection upgrade requested"
    );

    ws.max_frame_size(MAX_WS_FRAME_SIZE)
        .max_message_size(MAX_WS_MESSAGE_SIZE)
        .on_upgrade(move |socket| handle_relay_socket(socket, state, correlation_id))
}

/// Handle one relay WebSocket connection for its whole lifetime.
async fn handle_relay_socket(
    socket: WebSocket,
    app_state: Arc<AppState>,
    correlation_id: Option<String>,
) {
    let (mut sender, mut receiver) = socket.split();
    let (frame_tx, mut frame_rx) = mpsc::channel::<FrameRoute>(CHANNEL_BUFFER_SIZE);

    // Sender task: the only writer to the transport. When the connection is
    // gone this task is aborted, so nothing can be written after close.
    let sender_task = tokio::spawn(async move {
        while let Some(route) = frame_rx.recv().await {
            let result = match route {
                FrameRoute::Frame(frame) => {
                    sender.send(Message::Text(frame.to_json().to_string().into())).await
                }
                FrameRoute::Close => {
                    info!("Closing relay WebSocket connection");
                    let _ = sender.send(Message::Close(None)).await;
                    break;
                }
            };

            if let Err(e) = result {
                error!("Failed to send WebSocket message: {e}");
                break;
            }
        }
    });

    let session = SessionHandle::new(app_state, correlation_id, frame_tx);
    info!(session_id = %session.session_id(), "Relay session established");

    let mut last_activity = Instant::now();

    loop {
        select! {
            msg_result = receiver.next() => {
                last_activity = Instant::now();

                match msg_result {
                    Some(Ok(msg)) => {
                        if !process_socket_message(msg, &session).await {
                            break;
                        }
                    }
                    Some(Err(e)) => {
                        warn!(session_id = %session.session_id(), "Relay WebSocket error: {e}");
                        break;
                    }
                    None => {
                        info!(session_id = %session.session_id(), "Relay connection closed by peer");
                        break;
                    }
                }
            }
            _ = tokio::time::sleep(IDLE_SWEEP_INTERVAL) => {
                if last_activity.elapsed() > IDLE_TIMEOUT {
                    warn!(
                        session_id = %session.session_id(),
                        "Relay connection idle for {}s, closing",
                        last_activity.elapsed().as_secs()
                    );
                    break;
                }
                debug!(session_id = %session.session_id(), "Idle sweep - connection still active");
            }
        }
    }

    // Teardown: mark inactive, cancel in-flight work and pending handoff,
    // then stop the writer.
    session.on_close().await;
    sender_task.abort();

    info!(session_id = %session.session_id(), "Relay session terminated");
}

/// Route one raw socket message into the session.
///
/// Returns false when the connection should stop processing.
async fn process_socket_message(msg: Message, session: &SessionHandle) -> bool {
    match msg {
        Message::Text(text) => {
            match InboundFrame::parse(&text) {
                Ok(frame) => session.on_frame(frame).await,
                Err(FrameError::UnknownType(t)) => {
                    // Protocol superset; not our frame, not an error
                    debug!(session_id = %session.session_id(), "Ignoring frame of type {t}");
                }
                Err(e) => {
                    warn!(session_id = %session.session_id(), "Dropping malformed frame: {e}");
                }
            }
            true
        }
        Message::Binary(data) => {
            debug!(
                session_id = %session.session_id(),
                "Ignoring unexpected binary message ({} bytes)",
                data.len()
            );
            true
        }
        Message::Ping(_) | Message::Pong(_) => true,
        Message::Close(_) => {
            info!(session_id = %session.session_id(), "Relay close frame received");
            false
        }
    }
}
