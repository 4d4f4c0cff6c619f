//! aether-client library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! # What does aether-client do? (for beginners)
//!
//! The *client* sits next to the camera.  For every video frame it:
//!
//! 1. Asks a recognizer which hands are visible, where their 21 landmarks
//!    are, and which gesture each one makes.
//! 2. Reduces each hand to two numbers, height (`y`) and tilt (`rot`).
//! 3. Runs every enabled mapping through the streaming state machine to
//!    decide which values changed enough to be worth sending.
//! 4. Packs the survivors into one binary frame and pushes it down a
//!    WebSocket to the bridge, which turns it into OSC.
//!
//! The WebSocket reconnects on its own (a fixed number of attempts at a fixed
//! interval), and every fresh connection makes the client resend current
//! values so the receiver resynchronizes.

/// Application layer: the detection loop and the hand streamer.
pub mod application;

/// Infrastructure layer: WebSocket transport, replay recognizer, tick
/// sources, and configuration storage.
pub mod infrastructure;
