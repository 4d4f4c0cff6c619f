//! Binary frame codec for batches of control messages.
//!
//! Wire format, repeated once per message with no count prefix and no
//! padding:
//! ```text
//! [addr_len:1][address:addr_len][value:4]
//! ```
//! The address is ASCII without a terminator; the value is an IEEE-754
//! `f32`, **little-endian**.  A frame is therefore exactly
//! `Σ (1 + addr_len + 4)` bytes, and an empty batch is an empty frame.
//!
//! Decoding is all-or-nothing: a frame that ends mid-message or carries a
//! non-ASCII address is rejected as a whole, never partially applied.

use thiserror::Error;

use crate::protocol::messages::{ControlMessage, MAX_ADDRESS_LEN};

/// Size of the value field.
const VALUE_LEN: usize = 4;

/// Errors that can occur while encoding or decoding a frame.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    /// The address does not fit in the one-byte length field.
    #[error("address is {len} bytes, maximum is {MAX_ADDRESS_LEN}")]
    AddressTooLong { len: usize },

    /// The address contains bytes outside 7-bit ASCII.
    ///
    /// `at` is the message index when encoding and the byte offset when
    /// decoding.
    #[error("address at {at} is not ASCII")]
    NonAsciiAddress { at: usize },

    /// The frame ends before the message starting at `offset` is complete.
    #[error("truncated frame: message at offset {offset} needs {needed} bytes, {available} left")]
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Encodes a batch of messages into one frame.
///
/// # Errors
///
/// Returns [`FrameError`] if any address is longer than
/// [`MAX_ADDRESS_LEN`] bytes or is not ASCII; nothing is encoded in that case.
///
/// # Examples
///
/// ```rust
/// use aether_core::{encode_frame, decode_frame, ControlMessage};
///
/// let batch = vec![ControlMessage::new("/left/2/knob", 0.25)];
/// let bytes = encode_frame(&batch).unwrap();
/// assert_eq!(decode_frame(&bytes).unwrap(), batch);
/// ```
pub fn encode_frame(messages: &[ControlMessage]) -> Result<Vec<u8>, FrameError> {
    let mut size = 0;
    for (i, m) in messages.iter().enumerate() {
        let len = m.address.len();
        if len > MAX_ADDRESS_LEN {
            return Err(FrameError::AddressTooLong { len });
        }
        if !m.address.is_ascii() {
            return Err(FrameError::NonAsciiAddress { at: i });
        }
        size += 1 + len + VALUE_LEN;
    }

    let mut buf = Vec::with_capacity(size);
    for m in messages {
        // Length checked above.
        buf.push(m.address.len() as u8);
        buf.extend_from_slice(m.address.as_bytes());
        buf.extend_from_slice(&m.value.to_le_bytes());
    }
    Ok(buf)
}

/// Decodes a frame into its messages.
///
/// # Errors
///
/// Returns [`FrameError`] on any overrun or non-ASCII address.
pub fn decode_frame(bytes: &[u8]) -> Result<Vec<ControlMessage>, FrameError> {
    let mut messages = Vec::new();
    let mut offset = 0;

    while offset < bytes.len() {
        let addr_len = bytes[offset] as usize;
        let needed = 1 + addr_len + VALUE_LEN;
        let available = bytes.len() - offset;
        if available < needed {
            return Err(FrameError::Truncated {
                offset,
                needed,
                available,
            });
        }

        let addr_start = offset + 1;
        let addr_bytes = &bytes[addr_start..addr_start + addr_len];
        if !addr_bytes.is_ascii() {
            return Err(FrameError::NonAsciiAddress { at: offset });
        }
        // ASCII is valid UTF-8.
        let address = String::from_utf8_lossy(addr_bytes).into_owned();

        let value_start = addr_start + addr_len;
        let value = read_f32_le(&bytes[value_start..value_start + VALUE_LEN]);

        messages.push(ControlMessage { address, value });
        offset += needed;
    }

    Ok(messages)
}

// ── Utility helpers ───────────────────────────────────────────────────────────

fn read_f32_le(b: &[u8]) -> f32 {
    f32::from_le_bytes([b[0], b[1], b[2], b[3]])
}

// ── Tests ─────────────────────────────────────────────────────────────────────
