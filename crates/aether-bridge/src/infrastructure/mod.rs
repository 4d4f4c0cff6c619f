//! Infrastructure layer for aether-bridge.
//!
//! - Binding the WebSocket listener and accepting client sessions
//! - Performing the WebSocket upgrade handshake
//! - Sending OSC datagrams over UDP
//! - Handling the graceful shutdown signal
//!
//! Decoding and rebatching live in the application layer.

pub mod osc_sink;
pub mod ws_server;

pub use osc_sink::UdpOscSink;
pub use ws_server::{run_server, serve};
