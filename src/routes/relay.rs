//! Conversation relay WebSocket route configuration
//!
//! # Endpoint
//!
//! `GET /relay` - WebSocket upgrade for the telephony conversation stream
//!
//! # Protocol
//!
//! After upgrade, the telephony side sends one JSON object per text message:
//! `setup`/`start`, `prompt`, `media`, `stop`. The gateway answers with
//! `text` token frames (exactly one final frame per leg), optional paced
//! `media` frames followed by a `mark`, and a terminal `end` frame when the
//! call is handed off.
//!
//! An optional `correlation_id` query parameter ties the call to an external
//! CRM record for handoff logging.

use std::sync::Arc;

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::handlers::relay::relay_handler;
use crate::state::AppState;

/// Create the relay WebSocket router
pub fn create_relay_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/relay", get(relay_handler))
        .layer(TraceLayer::new_for_http())
}
