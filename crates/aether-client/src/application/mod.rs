//! Application layer: use cases for the tracking client.
//!
//! - [`stream_hands`] – turns hand frames into sent control messages.
//! - [`detection_loop`] – drives recognition → streaming once per tick.

pub mod detection_loop;
pub mod stream_hands;
