//! Conversation relay wire frame types
//!
//! Inbound frames arrive as one JSON object per WebSocket text message. The
//! two telephony protocols this gateway grew up against disagree on the tag
//! key (`type` vs `event`) and on several field names, so inbound parsing is
//! tolerant: either tag key is accepted, and known frames are matched by tag
//! value. Outbound frames keep the exact mixed encoding the downstream
//! player expects.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use bytes::Bytes;
use serde_json::{Value, json};
use thiserror::Error;

/// Maximum allowed size for a caller utterance (50 KB)
pub const MAX_UTTERANCE_SIZE: usize = 50 * 1024;

/// Reason code attached to the terminal end-of-call frame on handoff
pub const HANDOFF_REASON_CODE: &str = "sdr-handoff";

// =============================================================================
// Inbound Frames (telephony -> gateway)
// =============================================================================

/// Parsed inbound frame from the telephony stream.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundFrame {
    /// Call setup: identifiers captured once, first write wins
    Setup {
        call_identifier: String,
        caller_address: String,
    },
    /// One completed caller utterance
    Prompt { utterance: String },
    /// One raw media frame (decoded from base64)
    Media { payload: Bytes },
    /// End of the inbound media stream
    Stop,
}

/// Errors produced while decoding an inbound frame.
#[derive(Debug, Error)]
pub enum FrameError {
    /// Payload was not a JSON object
    #[error("Invalid frame JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Neither `type` nor `event` tag was present
    #[error("Frame has no type or event tag")]
    MissingTag,

    /// Tag value named no frame this gateway knows
    #[error("Unknown frame type: {0}")]
    UnknownType(String),

    /// A required field was absent or the wrong shape
    #[error("Frame is missing required field: {0}")]
    MissingField(&'static str),

    /// Media payload was not valid base64
    #[error("Invalid media payload: {0}")]
    Payload(#[from] base64::DecodeError),

    /// Utterance exceeded the allowed size
    #[error("Utterance too large: {size} bytes (max: {max} bytes)")]
    UtteranceTooLarge { size: usize, max: usize },
}

/// Read a string field under any of the given names.
fn string_field(value: &Value, names: &[&str]) -> Option<String> {
    names
        .iter()
        .find_map(|name| value.get(*name).and_then(Value::as_str))
        .map(str::to_string)
}

impl InboundFrame {
    /// Decode one inbound wire frame.
    ///
    /// Unknown tag values come back as [`FrameError::UnknownType`]; callers
    /// treat those as ignorable rather than malformed, since the surrounding
    /// protocol is a superset of what this gateway consumes.
    pub fn parse(text: &str) -> Result<Self, FrameError> {
        let value: Value = serde_json::from_str(text)?;

        let tag = value
            .get("type")
            .or_else(|| value.get("event"))
            .and_then(Value::as_str)
            .ok_or(FrameError::MissingTag)?;

        match tag {
            "setup" | "start" => {
                let call_identifier = string_field(&value, &["callSid", "callIdentifier"])
                    .ok_or(FrameError::MissingField("callSid"))?;
                let caller_address = string_field(&value, &["from", "callerAddress"])
                    .ok_or(FrameError::MissingField("from"))?;
                Ok(Self::Setup {
                    call_identifier,
                    caller_address,
                })
            }
            "prompt" => {
                let utterance = string_field(&value, &["voicePrompt", "utterance"])
                    .ok_or(FrameError::MissingField("voicePrompt"))?;
                if utterance.len() > MAX_UTTERANCE_SIZE {
                    return Err(FrameError::UtteranceTooLarge {
                        size: utterance.len(),
                        max: MAX_UTTERANCE_SIZE,
                    });
                }
                Ok(Self::Prompt { utterance })
            }
            "media" => {
                let encoded = value
                    .get("media")
                    .and_then(|m| m.get("payload"))
                    .and_then(Value::as_str)
                    .ok_or(FrameError::MissingField("media.payload"))?;
                let payload = BASE64.decode(encoded)?;
                Ok(Self::Media {
                    payload: Bytes::from(payload),
                })
            }
            "stop" => Ok(Self::Stop),
            other => Err(FrameError::UnknownType(other.to_string())),
        }
    }
}

// =============================================================================
// Outbound Frames (gateway -> telephony)
// =============================================================================

/// Outbound frame emitted toward the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundFrame {
    /// One token of agent text; `is_final` ends the leg
    TextChunk { token: String, is_final: bool },
    /// One paced frame of synthesized audio
    MediaChunk { payload: Bytes },
    /// Playback marker
    Mark { name: String },
    /// Terminal frame; nothing follows on this session
    EndOfCall { reason_code: String, reason: String },
}

impl OutboundFrame {
    /// Final terminator chunk closing a leg with no additional text.
    pub fn leg_terminator() -> Self {
        Self::TextChunk {
            token: String::new(),
            is_final: true,
        }
    }

    /// Encode to the wire JSON object.
    pub fn to_json(&self) -> Value {
        match self {
            Self::TextChunk { token, is_final } => json!({
                "type": "text",
                "token": token,
                "last": is_final,
            }),
            Self::MediaChunk { payload } => json!({
                "event": "media",
                "media": { "payload": BASE64.encode(payload) },
            }),
            Self::Mark { name } => json!({
                "event": "mark",
                "mark": { "name": name },
            }),
            Self::EndOfCall {
                reason_code,
                reason,
            } => {
                let handoff_data = json!({
                    "reasonCode": reason_code,
                    "reason": reason,
                });
                json!({
                    "type": "end",
                    // Nested JSON delivered as an encoded string, per protocol
                    "handoffData": handoff_data.to_string(),
                })
            }
        }
    }
}

// =============================================================================
// Frame Routing
// =============================================================================

/// Routing envelope between the session and the socket sender task.
#[derive(Debug)]
pub enum FrameRoute {
    /// JSON frame toward the caller
    Frame(OutboundFrame),
    /// Close the connection after draining
    Close,
}
