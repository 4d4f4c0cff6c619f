//! WebSocket server: accept loop and per-session tasks.
//!
//! 1. Bind a TCP listener on the configured address.
//! 2. Accept client connections, each in its own Tokio task.
//! 3. Upgrade to WebSocket and read frames until the client goes away.
//! 4. Classify every frame: binary → compact frame, text → JSON fallback.
//! 5. Forward each payload through the shared [`Forwarder`].
//!
//! A malformed payload is logged and dropped; the session stays open so one
//! bad frame from a client does not cost it its connection.
//!
//! Shutdown is driven by a shared `AtomicBool` (set by the Ctrl+C handler in
//! `main.rs`); the accept loop re-checks it at least every 200 ms.

use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use aether_core::Payload;
use anyhow::Context;
use futures_util::StreamExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_tungstenite::{
    accept_async,
    tungstenite::{Error as WsError, Message as WsMessage},
};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::application::Forwarder;
use crate::domain::BridgeConfig;
use crate::infrastructure::osc_sink::UdpOscSink;

const ACCEPT_POLL: Duration = Duration::from_millis(200);

// ── Public API ────────────────────────────────────────────────────────────────

/// Binds the WebSocket listener and the OSC socket, then serves until
/// `running` is cleared.
///
/// # Errors
///
/// Returns an error if either socket cannot be bound.
pub async fn run_server(config: BridgeConfig, running: Arc<AtomicBool>) -> anyhow::Result<()> {
    let sink = UdpOscSink::bind(config.osc_target_addr)
        .await
        .context("failed to bind OSC UDP socket")?;
    info!("OSC sending to {}", config.osc_target_addr);

    let listener = TcpListener::bind(config.ws_bind_addr)
        .await
        .with_context(|| format!("failed to bind WebSocket listener on {}", config.ws_bind_addr))?;
    info!("WebSocket listening on ws://{}", config.ws_bind_addr);

    serve(listener, Arc::new(Forwarder::new(Arc::new(sink))), running).await;
    Ok(())
}

/// Accept loop over an already-bound listener.
pub async fn serve(listener: TcpListener, forwarder: Arc<Forwarder>, running: Arc<AtomicBool>) {
    loop {
        if !running.load(Ordering::Relaxed) {
            info!("shutdown flag set; stopping accept loop");
            break;
        }

        match timeout(ACCEPT_POLL, listener.accept()).await {
            Ok(Ok((stream, peer_addr))) => {
                let fwd = Arc::clone(&forwarder);
                tokio::spawn(async move {
                    handle_session(stream, peer_addr, fwd).await;
                });
            }
            Ok(Err(e)) => {
                // Transient (e.g. too many open files); keep accepting.
                error!("accept error: {e}");
            }
            Err(_) => {}
        }
    }
}

// ── Per-session handler ───────────────────────────────────────────────────────

/// What to do with one inbound WebSocket frame.
#[derive(Debug, PartialEq)]
enum Inbound {
    Payload(Payload),
    Close,
    Ignore,
}

fn classify(message: WsMessage) -> Inbound {
    match message {
        WsMessage::Binary(bytes) => Inbound::Payload(Payload::Binary(bytes)),
        WsMessage::Text(text) => Inbound::Payload(Payload::Text(text)),
        WsMessage::Close(_) => Inbound::Close,
        // Pings are answered by tungstenite while reading.
        WsMessage::Ping(_) | WsMessage::Pong(_) | WsMessage::Frame(_) => Inbound::Ignore,
    }
}

async fn handle_session(raw_stream: TcpStream, peer_addr: SocketAddr, forwarder: Arc<Forwarder>) {
    let session = Uuid::new_v4();
    match run_session(raw_stream, peer_addr, session, forwarder).await {
        Ok(forwarded) => info!("session {session} ({peer_addr}) closed; {forwarded} messages forwarded"),
        Err(e) => warn!("session {session} ({peer_addr}) closed with error: {e:#}"),
    }
}

async fn run_session(
    raw_stream: TcpStream,
    peer_addr: SocketAddr,
    session: Uuid,
    forwarder: Arc<Forwarder>,
) -> anyhow::Result<u64> {
    let mut ws = accept_async(raw_stream)
        .await
        .with_context(|| format!("WebSocket handshake failed with {peer_addr}"))?;
    info!("session {session}: client connected from {peer_addr}");

    let mut forwarded = 0u64;
    loop {
        let message = match ws.next().await {
            Some(Ok(message)) => message,
            Some(Err(WsError::ConnectionClosed | WsError::Protocol(_))) | None => {
                debug!("session {session}: stream ended");
                break;
            }
            Some(Err(e)) => return Err(e).context("WebSocket read failed"),
        };

        match classify(message) {
            Inbound::Payload(payload) => match forwarder.forward(&payload).await {
                Ok(n) => forwarded += n as u64,
                Err(e) => warn!("session {session}: dropped {} byte payload: {e}", payload.len()),
            },
            Inbound::Close => {
                debug!("session {session}: close frame received");
                break;
            }
            Inbound::Ignore => {}
        }
    }

    Ok(forwarded)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
