//! Bridge configuration types.
//!
//! [`BridgeConfig`] is a plain struct with no environment reads of its own;
//! `main.rs` fills it from CLI arguments and environment variables.

use std::net::{Ipv4Addr, SocketAddr};

/// Default WebSocket listener port.
pub const DEFAULT_WS_PORT: u16 = 8888;

/// Default OSC receiver port.
pub const DEFAULT_OSC_PORT: u16 = 7099;

/// All runtime configuration for the bridge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Address the WebSocket server binds to.
    ///
    /// `0.0.0.0` accepts clients from any interface.
    pub ws_bind_addr: SocketAddr,

    /// Where OSC datagrams are sent.
    pub osc_target_addr: SocketAddr,
}

impl Default for BridgeConfig {
    /// | Field           | Default          |
    /// |-----------------|------------------|
    /// | ws_bind_addr    | `0.0.0.0:8888`   |
    /// | osc_target_addr | `127.0.0.1:7099` |
    fn default() -> Self {
        Self {
            ws_bind_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_WS_PORT)),
            osc_target_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, DEFAULT_OSC_PORT)),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
