//! Transport-level payload: the binary frame or the legacy JSON text.
//!
//! WebSocket frames are either binary or text.  [`Payload`] mirrors that
//! split so the decision of which codec applies is made once, where the
//! frame enters or leaves the socket.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::protocol::codec::{decode_frame, encode_frame, FrameError};
use crate::protocol::messages::ControlMessage;
use crate::protocol::text::{decode_text, encode_text, TextPayloadError};

/// Which payload kind a client produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireFormat {
    /// Compact binary frames (see [`crate::protocol::codec`]).
    #[default]
    Binary,
    /// Legacy JSON text frames (see [`crate::protocol::text`]).
    Json,
}

/// Errors from either payload codec.
#[derive(Debug, Error)]
pub enum PayloadError {
    #[error(transparent)]
    Frame(#[from] FrameError),

    #[error(transparent)]
    Text(#[from] TextPayloadError),
}

/// One WebSocket data frame carrying a batch of control messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Binary(Vec<u8>),
    Text(String),
}

impl Payload {
    /// Encodes a batch in the requested wire format.
    ///
    /// # Errors
    ///
    /// Returns [`PayloadError`] if the batch cannot be represented.
    pub fn encode(messages: &[ControlMessage], format: WireFormat) -> Result<Payload, PayloadError> {
        Ok(match format {
            WireFormat::Binary => Payload::Binary(encode_frame(messages)?),
            WireFormat::Json => Payload::Text(encode_text(messages)?),
        })
    }

    /// Decodes the batch with the codec matching the frame kind.
    ///
    /// # Errors
    ///
    /// Returns [`PayloadError`] for a malformed frame; nothing is partially
    /// decoded.
    pub fn decode(&self) -> Result<Vec<ControlMessage>, PayloadError> {
        Ok(match self {
            Payload::Binary(bytes) => decode_frame(bytes)?,
            Payload::Text(text) => decode_text(text)?,
        })
    }

    /// Size of the frame body in bytes.
    pub fn len(&self) -> usize {
        match self {
            Payload::Binary(b) => b.len(),
            Payload::Text(t) => t.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
