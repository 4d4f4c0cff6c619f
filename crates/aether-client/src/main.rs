//! Aether tracking client entry point.
//!
//! Loads the configuration and mappings, connects to the bridge, and runs the
//! detection loop over a recorded session until it ends or the user presses
//! Ctrl+C.
//!
//! # Usage
//!
//! ```text
//! aether-client [OPTIONS] --replay <FILE>
//!
//! Options:
//!   --config <PATH>  Config file [default: platform config dir]
//!   --url    <URL>   Bridge WebSocket URL (overrides the config file)
//!   --replay <FILE>  JSON-lines recording of recognition results
//!   --fps    <N>     Playback rate (overrides frame_interval_ms)
//! ```
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ load_config_from()          -- settings + mappings
//!  └─ TransportClient::websocket() -- reconnecting link to the bridge
//!  └─ Pipeline::start()
//!       ├─ ReplayRecognizer        -- recorded hands, one line per frame
//!       ├─ IntervalTicks           -- frame clock
//!       └─ HandStreamer            -- mappings → control messages
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::sync::RwLock;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use aether_client::application::detection_loop::Pipeline;
use aether_client::infrastructure::network::{ConnectionStatus, TransportClient};
use aether_client::infrastructure::recognizer::ReplayRecognizer;
use aether_client::infrastructure::storage::config::{config_file_path, load_config_from};
use aether_client::infrastructure::ticks::IntervalTicks;

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Aether tracking client.
///
/// Streams gesture-driven control values to an Aether bridge.
#[derive(Debug, Parser)]
#[command(
    name = "aether-client",
    about = "Streams hand-gesture control values to an Aether bridge",
    version
)]
struct Cli {
    /// Path to the TOML config file.
    #[arg(long, env = "AETHER_CONFIG")]
    config: Option<PathBuf>,

    /// Bridge WebSocket URL, e.g. `ws://127.0.0.1:8888`.
    #[arg(long, env = "AETHER_URL")]
    url: Option<String>,

    /// Recorded recognition results to play back (JSON lines).
    #[arg(long)]
    replay: PathBuf,

    /// Frames per second; defaults to the configured frame interval.
    #[arg(long)]
    fps: Option<u32>,
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = match cli.config {
        Some(path) => path,
        None => config_file_path().context("no config path given and no platform config dir")?,
    };
    let mut config = load_config_from(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;
    if let Some(url) = cli.url {
        config.transport.url = url;
    }

    // `RUST_LOG` wins; otherwise use the configured level.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.client.log_level)),
        )
        .init();

    // Collisions are logged by the store itself.
    let store = config.mapping_store();
    info!(
        "Aether client starting: bridge={}, mappings={}, replay={}",
        config.transport.url,
        store.len(),
        cli.replay.display()
    );

    let transport = Arc::new(TransportClient::websocket(config.transport_config()));

    let mut status = transport.status();
    tokio::spawn(async move {
        while status.changed().await.is_ok() {
            let current = *status.borrow_and_update();
            match current {
                ConnectionStatus::Connected => info!("bridge link up"),
                ConnectionStatus::Disconnected => info!("bridge link down"),
                ConnectionStatus::Error => warn!("bridge link error"),
            }
        }
    });

    let ticks = match cli.fps {
        Some(fps) => IntervalTicks::from_fps(fps),
        None => IntervalTicks::new(config.frame_interval()),
    };

    let mut pipeline = Pipeline::start(
        Box::new(ReplayRecognizer::new(&cli.replay)),
        Box::new(ticks),
        Arc::new(RwLock::new(store)),
        transport.clone(),
        config.pipeline_config(),
    )
    .context("failed to start detection pipeline")?;

    tokio::select! {
        summary = pipeline.join() => match summary {
            Some(s) => info!(
                "replay finished: {} frames, {} skipped, {} messages",
                s.frames, s.skipped, s.messages
            ),
            None => error!("detection loop ended abnormally"),
        },
        signal = tokio::signal::ctrl_c() => match signal {
            Ok(()) => info!("received Ctrl+C, shutting down"),
            Err(e) => error!("failed to listen for Ctrl+C signal: {e}"),
        },
    }

    pipeline.stop();
    transport.destroy();
    info!("Aether client stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_requires_replay() {
        let result = Cli::try_parse_from(["aether-client"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_parses_overrides() {
        // Arrange / Act
        let cli = Cli::parse_from([
            "aether-client",
            "--replay",
            "session.jsonl",
            "--url",
            "ws://10.0.0.2:8888",
            "--fps",
            "30",
        ]);

        // Assert
        assert_eq!(cli.replay, PathBuf::from("session.jsonl"));
        assert_eq!(cli.url.as_deref(), Some("ws://10.0.0.2:8888"));
        assert_eq!(cli.fps, Some(30));
    }
}
