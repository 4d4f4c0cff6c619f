//! aether-bridge library crate.
//!
//! Receives control frames from Aether clients over WebSocket and re-emits
//! them as OSC over UDP for music software.
//!
//! # Architecture
//!
//! ```text
//! aether-client  (binary frames or JSON over WebSocket)
//!         ↕
//! [aether-bridge]
//!   ├── domain/           BridgeConfig
//!   ├── application/      Forwarder: payload → OSC message or bundle
//!   └── infrastructure/
//!         ├── ws_server/  WebSocket accept loop (tokio-tungstenite)
//!         └── osc_sink/   UDP socket towards the OSC receiver
//!         ↓
//! OSC receiver  (UDP, port 7099)
//! ```
//!
//! # Layer rules
//!
//! - `domain` has no I/O.
//! - `application` depends on `domain` and `aether-core`; it reaches the
//!   network only through the [`application::OscSink`] trait.
//! - `infrastructure` owns the sockets.
//!
//! The bridge is one-way: nothing is ever sent back to the client beyond
//! WebSocket control frames, and OSC has no acknowledgement.

/// Domain layer: configuration.
pub mod domain;

/// Application layer: payload to OSC forwarding.
pub mod application;

/// Infrastructure layer: WebSocket server and UDP sink.
pub mod infrastructure;
