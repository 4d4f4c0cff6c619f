//! Application layer for aether-bridge.
//!
//! Knows *what* to do with an inbound payload (decode, rebatch, encode as
//! OSC) and delegates *how* the datagram leaves the process to an
//! [`OscSink`].

pub mod forwarder;

pub use forwarder::{to_datagram, ForwardError, Forwarder, OscSink};
