//! OSC 1.0 packets: float messages and bundles.
//!
//! Only the subset the bridge emits is supported:
//!
//! ```text
//! message:  [address\0 pad4][",f\0\0"][value: f32 big-endian]
//! bundle:   ["#bundle\0"][timetag: u64 big-endian][ [size: i32 BE][message] ... ]
//! ```
//!
//! Strings are NUL-terminated and padded with NULs to a multiple of four
//! bytes.  Bundles always carry the time tag `1`, which OSC defines as
//! "immediately".

use thiserror::Error;

use crate::protocol::messages::ControlMessage;

/// OSC time tag meaning "process immediately".
pub const IMMEDIATELY: u64 = 1;

const BUNDLE_TAG: &[u8; 8] = b"#bundle\0";
const FLOAT_TYPE_TAG: &[u8; 4] = b",f\0\0";

/// Errors produced while encoding or decoding OSC packets.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OscError {
    /// OSC strings cannot contain NUL bytes and must be ASCII.
    #[error("invalid OSC address {0:?}")]
    InvalidAddress(String),

    /// A bundle must contain at least one element.
    #[error("empty OSC bundle")]
    EmptyBundle,

    /// The packet is shorter than its structure requires.
    #[error("truncated OSC packet: need {needed} bytes at offset {offset}")]
    Truncated { offset: usize, needed: usize },

    /// The packet uses a feature outside the supported subset.
    #[error("unsupported OSC packet: {0}")]
    Unsupported(String),
}

/// One UDP datagram worth of OSC.
#[derive(Debug, Clone, PartialEq)]
pub enum OscPacket {
    /// A single float message.
    Message(ControlMessage),
    /// Several float messages with the "immediately" time tag.
    Bundle(Vec<ControlMessage>),
}

impl OscPacket {
    /// Chooses the packet shape for a batch.
    ///
    /// An empty batch produces nothing, one message is sent bare, and two or
    /// more are wrapped in a bundle so they arrive in one datagram.
    pub fn for_batch(mut messages: Vec<ControlMessage>) -> Option<OscPacket> {
        match messages.len() {
            0 => None,
            1 => messages.pop().map(OscPacket::Message),
            _ => Some(OscPacket::Bundle(messages)),
        }
    }

    /// Number of control messages in the packet.
    pub fn len(&self) -> usize {
        match self {
            OscPacket::Message(_) => 1,
            OscPacket::Bundle(ms) => ms.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Encodes the packet into datagram bytes.
    ///
    /// # Errors
    ///
    /// Returns [`OscError`] for addresses that cannot be OSC strings or an
    /// empty bundle.
    pub fn encode(&self) -> Result<Vec<u8>, OscError> {
        let mut buf = Vec::new();
        match self {
            OscPacket::Message(m) => encode_message(&mut buf, m)?,
            OscPacket::Bundle(ms) => {
                if ms.is_empty() {
                    return Err(OscError::EmptyBundle);
                }
                buf.extend_from_slice(BUNDLE_TAG);
                buf.extend_from_slice(&IMMEDIATELY.to_be_bytes());
                for m in ms {
                    let mut element = Vec::new();
                    encode_message(&mut element, m)?;
                    buf.extend_from_slice(&(element.len() as i32).to_be_bytes());
                    buf.extend_from_slice(&element);
                }
            }
        }
        Ok(buf)
    }

    /// Decodes a packet produced by [`OscPacket::encode`].
    ///
    /// Nested bundles, type tags other than `,f`, and time tags other than
    /// "immediately" are rejected.
    ///
    /// # Errors
    ///
    /// Returns [`OscError`] for truncated or unsupported packets.
    pub fn decode(bytes: &[u8]) -> Result<OscPacket, OscError> {
        if !bytes.starts_with(BUNDLE_TAG) {
            let (m, end) = decode_message(bytes, 0)?;
            if end != bytes.len() {
                return Err(OscError::Unsupported("trailing bytes after message".into()));
            }
            return Ok(OscPacket::Message(m));
        }

        let timetag = read_u64(bytes, BUNDLE_TAG.len())?;
        if timetag != IMMEDIATELY {
            return Err(OscError::Unsupported(format!("time tag {timetag}")));
        }

        let mut offset = BUNDLE_TAG.len() + 8;
        let mut messages = Vec::new();
        while offset < bytes.len() {
            let size = read_i32(bytes, offset)?;
            let size = usize::try_from(size)
                .map_err(|_| OscError::Unsupported(format!("element size {size}")))?;
            offset += 4;
            require(bytes, offset, size)?;
            let element = &bytes[offset..offset + size];
            if element.starts_with(BUNDLE_TAG) {
                return Err(OscError::Unsupported("nested bundle".into()));
            }
            let (m, end) = decode_message(element, 0)?;
            if end != size {
                return Err(OscError::Unsupported("element size mismatch".into()));
            }
            messages.push(m);
            offset += size;
        }

        if messages.is_empty() {
            return Err(OscError::EmptyBundle);
        }
        Ok(OscPacket::Bundle(messages))
    }
}

// ── Encoding helpers ──────────────────────────────────────────────────────────

fn encode_message(buf: &mut Vec<u8>, m: &ControlMessage) -> Result<(), OscError> {
    if !m.address.is_ascii() || m.address.contains('\0') {
        return Err(OscError::InvalidAddress(m.address.clone()));
    }
    write_padded_str(buf, &m.address);
    buf.extend_from_slice(FLOAT_TYPE_TAG);
    buf.extend_from_slice(&m.value.to_be_bytes());
    Ok(())
}

/// Writes `s`, a NUL terminator, and NUL padding up to a 4-byte boundary.
fn write_padded_str(buf: &mut Vec<u8>, s: &str) {
    buf.extend_from_slice(s.as_bytes());
    let padded = padded_len(s.len());
    buf.resize(buf.len() + (padded - s.len()), 0);
}

/// Length of a NUL-terminated, 4-byte-aligned OSC string of `len` bytes.
fn padded_len(len: usize) -> usize {
    (len + 4) & !3
}

// ── Decoding helpers ──────────────────────────────────────────────────────────

fn decode_message(bytes: &[u8], offset: usize) -> Result<(ControlMessage, usize), OscError> {
    let (address, offset) = read_padded_str(bytes, offset)?;
    let (type_tag, offset) = read_padded_str(bytes, offset)?;
    if type_tag != ",f" {
        return Err(OscError::Unsupported(format!("type tag {type_tag:?}")));
    }
    require(bytes, offset, 4)?;
    let value = f32::from_be_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ]);
    Ok((ControlMessage { address, value }, offset + 4))
}

fn read_padded_str(bytes: &[u8], offset: usize) -> Result<(String, usize), OscError> {
    let rest = bytes.get(offset..).unwrap_or_default();
    let nul = rest
        .iter()
        .position(|&b| b == 0)
        .ok_or(OscError::Truncated { offset, needed: rest.len() + 1 })?;
    let end = offset + padded_len(nul);
    require(bytes, offset, end - offset)?;
    let s = std::str::from_utf8(&rest[..nul])
        .map_err(|_| OscError::InvalidAddress(String::from_utf8_lossy(&rest[..nul]).into_owned()))?;
    Ok((s.to_string(), end))
}

fn require(bytes: &[u8], offset: usize, needed: usize) -> Result<(), OscError> {
    if bytes.len() < offset + needed {
        Err(OscError::Truncated { offset, needed })
    } else {
        Ok(())
    }
}

fn read_u64(bytes: &[u8], offset: usize) -> Result<u64, OscError> {
    require(bytes, offset, 8)?;
    let mut b = [0u8; 8];
    b.copy_from_slice(&bytes[offset..offset + 8]);
    Ok(u64::from_be_bytes(b))
}

fn read_i32(bytes: &[u8], offset: usize) -> Result<i32, OscError> {
    require(bytes, offset, 4)?;
    let mut b = [0u8; 4];
    b.copy_from_slice(&bytes[offset..offset + 4]);
    Ok(i32::from_be_bytes(b))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_batch_picks_packet_shape() {
        assert_eq!(OscPacket::for_batch(vec![]), None);

        let one = OscPacket::for_batch(vec![ControlMessage::new("/a", 1.0)]);
        assert_eq!(one, Some(OscPacket::Message(ControlMessage::new("/a", 1.0))));

        let two = OscPacket::for_batch(vec![
            ControlMessage::new("/a", 1.0),
            ControlMessage::new("/b", 0.0),
        ]);
        assert!(matches!(two, Some(OscPacket::Bundle(ref ms)) if ms.len() == 2));
    }

    #[test]
    fn test_message_bytes_are_padded_and_big_endian() {
        // "/abc" is 4 bytes, so the terminator forces a full extra word.
        let bytes = OscPacket::Message(ControlMessage::new("/abc", 1.0))
            .encode()
            .unwrap();

        assert_eq!(
            bytes,
            [
                b'/', b'a', b'b', b'c', 0, 0, 0, 0, // address
                b',', b'f', 0, 0, // type tag
                0x3F, 0x80, 0x00, 0x00, // 1.0f32 BE
            ]
        );
    }

    #[test]
    fn test_bundle_header_and_element_sizes() {
        let packet = OscPacket::Bundle(vec![
            ControlMessage::new("/left/0/fader", 0.5),
            ControlMessage::new("/right/1/knob", 0.25),
        ]);

        let bytes = packet.encode().unwrap();

        assert_eq!(&bytes[..8], b"#bundle\0");
        assert_eq!(&bytes[8..16], &1u64.to_be_bytes());
        // "/left/0/fader" is 13 bytes → 16 padded, + 4 type tag + 4 value
        assert_eq!(&bytes[16..20], &24i32.to_be_bytes());
        assert_eq!(bytes.len() % 4, 0);
        assert_eq!(OscPacket::decode(&bytes).unwrap(), packet);
    }

    #[test]
    fn test_encode_rejects_nul_in_address() {
        let packet = OscPacket::Message(ControlMessage::new("/a\0b", 0.0));
        assert!(matches!(packet.encode(), Err(OscError::InvalidAddress(_))));
    }

    #[test]
    fn test_encode_rejects_empty_bundle() {
        assert_eq!(OscPacket::Bundle(vec![]).encode(), Err(OscError::EmptyBundle));
    }

    #[test]
    fn test_decode_rejects_truncated_message() {
        let mut bytes = OscPacket::Message(ControlMessage::new("/a", 0.5))
            .encode()
            .unwrap();
        bytes.truncate(bytes.len() - 2);
        assert!(matches!(
            OscPacket::decode(&bytes),
            Err(OscError::Truncated { .. })
        ));
    }
}
