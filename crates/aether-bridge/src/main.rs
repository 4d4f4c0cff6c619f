//! Aether bridge entry point.
//!
//! Accepts WebSocket connections from Aether clients and forwards every
//! control frame to an OSC receiver over UDP.
//!
//! # Usage
//!
//! ```text
//! aether-bridge [OPTIONS]
//!
//! Options:
//!   --ws-port  <PORT>  WebSocket listener port [default: 8888]
//!   --ws-bind  <IP>    WebSocket bind address [default: 0.0.0.0]
//!   --osc-host <IP>    OSC receiver address [default: 127.0.0.1]
//!   --osc-port <PORT>  OSC receiver port [default: 7099]
//! ```
//!
//! # Environment variable overrides
//!
//! CLI args take precedence when both are present.
//!
//! | Variable          | Default     |
//! |-------------------|-------------|
//! | `AETHER_WS_PORT`  | `8888`      |
//! | `AETHER_WS_BIND`  | `0.0.0.0`   |
//! | `AETHER_OSC_HOST` | `127.0.0.1` |
//! | `AETHER_OSC_PORT` | `7099`      |

use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use aether_bridge::domain::config::{DEFAULT_OSC_PORT, DEFAULT_WS_PORT};
use aether_bridge::domain::BridgeConfig;
use aether_bridge::infrastructure::run_server;

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Aether WebSocket-to-OSC bridge.
#[derive(Debug, Parser)]
#[command(
    name = "aether-bridge",
    about = "Forwards Aether control frames from WebSocket to OSC over UDP",
    version
)]
struct Cli {
    /// TCP port for the WebSocket server.
    #[arg(long, default_value_t = DEFAULT_WS_PORT, env = "AETHER_WS_PORT")]
    ws_port: u16,

    /// IP address to bind the WebSocket server to.
    ///
    /// `0.0.0.0` accepts clients on any interface; `127.0.0.1` only local ones.
    #[arg(long, default_value = "0.0.0.0", env = "AETHER_WS_BIND")]
    ws_bind: String,

    /// IP address of the OSC receiver.
    #[arg(long, default_value = "127.0.0.1", env = "AETHER_OSC_HOST")]
    osc_host: String,

    /// UDP port of the OSC receiver.
    #[arg(long, default_value_t = DEFAULT_OSC_PORT, env = "AETHER_OSC_PORT")]
    osc_port: u16,
}

impl Cli {
    /// Converts the parsed CLI arguments into a [`BridgeConfig`].
    ///
    /// # Errors
    ///
    /// Returns an error if `--ws-bind` or `--osc-host` is not a valid IP
    /// address.
    fn into_bridge_config(self) -> anyhow::Result<BridgeConfig> {
        let ws_bind_addr: SocketAddr = format!("{}:{}", self.ws_bind, self.ws_port)
            .parse()
            .with_context(|| {
                format!("invalid WebSocket bind address: '{}:{}'", self.ws_bind, self.ws_port)
            })?;

        let osc_target_addr: SocketAddr = format!("{}:{}", self.osc_host, self.osc_port)
            .parse()
            .with_context(|| {
                format!("invalid OSC target address: '{}:{}'", self.osc_host, self.osc_port)
            })?;

        Ok(BridgeConfig {
            ws_bind_addr,
            osc_target_addr,
        })
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Cli::parse().into_bridge_config()?;

    info!(
        "Aether bridge starting: ws={}, osc={}",
        config.ws_bind_addr, config.osc_target_addr
    );

    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received Ctrl+C, shutting down");
                running_clone.store(false, Ordering::Relaxed);
            }
            Err(e) => {
                tracing::error!("failed to listen for Ctrl+C signal: {e}");
            }
        }
    });

    run_server(config, running).await?;

    info!("Aether bridge stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
