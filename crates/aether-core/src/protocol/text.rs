//! Legacy JSON text payload.
//!
//! Older clients send control messages as WebSocket *text* frames holding
//! either one object or an array of objects:
//!
//! ```text
//! {"address": "/left/0/fader", "value": 0.5}
//! [{"address": "/left/0/fader", "value": 0.5}, {"address": "/right/2/knob", "value": 0.1}]
//! ```
//!
//! The bridge accepts both shapes at all times; the client produces them only
//! when configured for the JSON wire format.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::protocol::messages::ControlMessage;

/// Errors produced by the JSON text payload codec.
#[derive(Debug, Error)]
pub enum TextPayloadError {
    /// The text is not a control message object or an array of them.
    #[error("invalid JSON control payload: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TextPayload {
    One(ControlMessage),
    Many(Vec<ControlMessage>),
}

#[derive(Serialize)]
#[serde(untagged)]
enum TextPayloadRef<'a> {
    One(&'a ControlMessage),
    Many(&'a [ControlMessage]),
}

/// Parses a text payload into its messages.
///
/// # Errors
///
/// Returns [`TextPayloadError::Json`] for anything that is not a message
/// object or an array of message objects.
pub fn decode_text(text: &str) -> Result<Vec<ControlMessage>, TextPayloadError> {
    Ok(match serde_json::from_str(text)? {
        TextPayload::One(m) => vec![m],
        TextPayload::Many(ms) => ms,
    })
}

/// Serializes a batch: one message as a plain object, otherwise an array.
///
/// # Errors
///
/// Returns [`TextPayloadError::Json`] if serialization fails.  Non-finite
/// values are written as `null`, which [`decode_text`] rejects.
pub fn encode_text(messages: &[ControlMessage]) -> Result<String, TextPayloadError> {
    let payload = match messages {
        [one] => TextPayloadRef::One(one),
        many => TextPayloadRef::Many(many),
    };
    Ok(serde_json::to_string(&payload)?)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
