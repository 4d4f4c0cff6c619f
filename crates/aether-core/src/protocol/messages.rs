//! The control message exchanged by every component.

use serde::{Deserialize, Serialize};

/// Longest address the binary frame can carry (one length byte).
pub const MAX_ADDRESS_LEN: usize = u8::MAX as usize;

/// One `{address, value}` update, e.g. `{"/right/0/fader", 0.42}`.
///
/// Transient: built per frame by the streaming engine, encoded, sent, and
/// dropped.  The same struct is the JSON shape of the text payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlMessage {
    pub address: String,
    pub value: f32,
}

impl ControlMessage {
    pub fn new(address: impl Into<String>, value: f32) -> Self {
        Self {
            address: address.into(),
            value,
        }
    }
}
