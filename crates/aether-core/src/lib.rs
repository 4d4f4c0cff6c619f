//! # aether-core
//!
//! Shared library for Aether containing the gesture domain model, the
//! streaming state machine, and the wire codecs.
//!
//! This crate is used by both the tracking client and the OSC bridge.
//! It has zero dependencies on OS APIs, UI frameworks, or network sockets.
//!
//! # Architecture overview (for beginners)
//!
//! Aether turns hand-tracking results into OSC control messages for music
//! software.  A recognition engine reports, for every video frame, where each
//! hand is and which gesture it makes.  Aether reduces that to two numbers per
//! hand (height and rotation), decides per user-defined *mapping* whether a
//! value is worth sending, and ships the values to a bridge that re-emits them
//! as OSC over UDP.
//!
//! This crate (`aether-core`) is the shared foundation.  It defines:
//!
//! - **`domain`** – Pure business logic: the gesture vocabulary, the
//!   `Mapping` routing rule and its store, and the landmark processor that
//!   turns 21 hand landmarks into the `y` / `rot` channels.
//!
//! - **`streaming`** – The per-mapping state machine (trigger debounce,
//!   switch toggling, fader/knob thresholding and smoothing).
//!
//! - **`protocol`** – How bytes travel over the network: the compact binary
//!   frame used between client and bridge, the legacy JSON text payload, and
//!   the OSC packets emitted by the bridge.

pub mod domain;
pub mod protocol;
pub mod streaming;

// Re-export the most-used types at the crate root so callers can write
// `aether_core::Mapping` instead of `aether_core::domain::mapping::Mapping`.
pub use domain::gesture::{Gesture, Hand, Mode};
pub use domain::hand::{GestureHandData, HandFrame};
pub use domain::landmarks::{process_hand_landmarks, HandChannels, HandLandmarks, Landmark};
pub use domain::mapping::{
    derive_address, AddressCollision, Mapping, MappingDraft, MappingError, MappingId, MappingStore,
    MappingUpdate,
};
pub use protocol::codec::{decode_frame, encode_frame, FrameError};
pub use protocol::messages::{ControlMessage, MAX_ADDRESS_LEN};
pub use protocol::osc::{OscError, OscPacket};
pub use protocol::payload::{Payload, PayloadError, WireFormat};
pub use protocol::text::{decode_text, encode_text, TextPayloadError};
pub use streaming::{Emission, StreamingConfig, StreamingEngine, StreamingEntry};
