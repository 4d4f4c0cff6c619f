//! Protocol module: control messages and the codecs that carry them.
//!
//! - [`codec`] – the compact binary frame used between client and bridge.
//! - [`text`] – the legacy JSON text payload (object or array).
//! - [`osc`] – OSC messages and bundles emitted by the bridge over UDP.
//! - [`payload`] – the binary-or-text union seen at the WebSocket boundary.

pub mod codec;
pub mod messages;
pub mod osc;
pub mod payload;
pub mod text;

pub use codec::{decode_frame, encode_frame, FrameError};
pub use messages::{ControlMessage, MAX_ADDRESS_LEN};
pub use osc::{OscError, OscPacket};
pub use payload::{Payload, PayloadError, WireFormat};
pub use text::{decode_text, encode_text, TextPayloadError};
