//! Network infrastructure for the client application.
//!
//! Owns the WebSocket link to the bridge and keeps it alive.
//!
//! Architecture:
//! - [`TransportClient`] is the handle the application holds.  Its methods
//!   never block: `connect` spawns a supervisor task, `send` pushes an encoded
//!   frame onto a bounded queue.
//! - The supervisor task connects through a [`Connector`], drains the queue
//!   into the socket, watches for the peer closing, and reconnects at a fixed
//!   interval up to a fixed number of attempts.
//! - Bookkeeping (phase, attempt counter, manual close) lives in the pure
//!   [`state::ConnectionState`]; the supervisor only reports events to it.
//!
//! Every `connect` starts a new *run*.  `disconnect` bumps the run id, so a
//! supervisor that is still finishing an old run can never overwrite the
//! state of a newer one.

pub mod state;
pub mod websocket;

pub use state::{CloseAction, ConnectionState, ConnectionStatus, Phase};
pub use websocket::WsConnector;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use aether_core::{ControlMessage, Payload, PayloadError, WireFormat};
use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, trace, warn};

use crate::application::stream_hands::ControlTransport;

// ── Errors and configuration ──────────────────────────────────────────────────

/// Errors that can occur in the client transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The WebSocket handshake with the bridge failed.
    #[error("failed to connect to {url}: {source}")]
    Connect {
        url: String,
        #[source]
        source: tokio_tungstenite::tungstenite::Error,
    },
    /// An error occurred on the established connection.
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
    /// A batch could not be encoded.
    #[error("encode error: {0}")]
    Encode(#[from] PayloadError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration for the client's connection to the bridge.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportConfig {
    /// Bridge WebSocket URL.
    pub url: String,
    /// Wait between a close and the next attempt.
    pub reconnect_interval: Duration,
    /// Reconnect attempts after a drop before giving up.
    pub max_reconnect_attempts: u32,
    /// Frame format put on the wire.
    pub wire_format: WireFormat,
    /// Frames buffered while the socket is busy; newer frames are dropped
    /// when full.
    pub send_queue: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            url: "ws://127.0.0.1:8888".to_string(),
            reconnect_interval: Duration::from_secs(3),
            max_reconnect_attempts: 5,
            wire_format: WireFormat::Binary,
            send_queue: 64,
        }
    }
}

// ── Connection ports ──────────────────────────────────────────────────────────

/// Opens connections to the bridge.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    async fn connect(&self, url: &str) -> Result<Connection, TransportError>;
}

/// Write half of an open connection.
#[async_trait]
pub trait FrameSink: Send {
    async fn send(&mut self, payload: Payload) -> Result<(), TransportError>;

    /// Starts a clean close; errors are not interesting at this point.
    async fn close(&mut self);
}

/// Read half of an open connection.
#[async_trait]
pub trait FrameSource: Send {
    /// Resolves when the connection ends: `None` for a clean close, the
    /// error otherwise.
    ///
    /// Must be cancel-safe; the supervisor polls it inside `select!`.
    async fn closed(&mut self) -> Option<TransportError>;
}

/// Both halves of an open connection.
pub struct Connection {
    pub sink: Box<dyn FrameSink>,
    pub source: Box<dyn FrameSource>,
}

// ── Transport client ──────────────────────────────────────────────────────────

struct Inner {
    state: ConnectionState,
    run_id: u64,
    outbound: Option<mpsc::Sender<Payload>>,
    shutdown: Option<watch::Sender<bool>>,
}

struct Shared {
    config: TransportConfig,
    connector: Arc<dyn Connector>,
    inner: Mutex<Inner>,
    status_tx: watch::Sender<ConnectionStatus>,
    generation: AtomicU64,
}

/// Auto-reconnecting WebSocket client for the bridge.
pub struct TransportClient {
    shared: Arc<Shared>,
}

impl TransportClient {
    /// Creates a new (not yet connected) client.
    pub fn new(config: TransportConfig, connector: Arc<dyn Connector>) -> Self {
        let (status_tx, _) = watch::channel(ConnectionStatus::Disconnected);
        let state = ConnectionState::new(config.max_reconnect_attempts);
        Self {
            shared: Arc::new(Shared {
                config,
                connector,
                inner: Mutex::new(Inner {
                    state,
                    run_id: 0,
                    outbound: None,
                    shutdown: None,
                }),
                status_tx,
                generation: AtomicU64::new(0),
            }),
        }
    }

    /// A client that talks real WebSockets.
    pub fn websocket(config: TransportConfig) -> Self {
        Self::new(config, Arc::new(WsConnector))
    }

    pub fn config(&self) -> &TransportConfig {
        &self.shared.config
    }

    /// Subscribes to status changes.
    pub fn status(&self) -> watch::Receiver<ConnectionStatus> {
        self.shared.status_tx.subscribe()
    }

    pub fn current_status(&self) -> ConnectionStatus {
        *self.shared.status_tx.borrow()
    }

    /// Copy of the connection bookkeeping.
    pub fn snapshot(&self) -> ConnectionState {
        self.shared.lock().state.clone()
    }

    /// Starts connecting in the background.
    ///
    /// No-op when already connected or connecting, or after [`destroy`].
    /// Must be called from within a Tokio runtime.
    ///
    /// [`destroy`]: TransportClient::destroy
    pub fn connect(&self) {
        let (run_id, shutdown_rx) = {
            let mut inner = self.shared.lock();
            if !inner.state.begin_connect() {
                debug!("connect ignored in phase {:?}", inner.state.phase());
                return;
            }
            inner.run_id += 1;
            let (tx, rx) = watch::channel(false);
            inner.shutdown = Some(tx);
            (inner.run_id, rx)
        };

        info!("connecting to {}", self.shared.config.url);
        tokio::spawn(supervise(Arc::clone(&self.shared), run_id, shutdown_rx));
    }

    /// Closes the connection and cancels any pending reconnect.
    pub fn disconnect(&self) {
        let mut inner = self.shared.lock();
        inner.state.mark_manual_close();
        self.shared.end_run(&mut inner);
    }

    /// Closes the connection for good; later `connect` calls are ignored.
    pub fn destroy(&self) {
        let mut inner = self.shared.lock();
        if inner.state.is_destroyed() {
            return;
        }
        inner.state.destroy();
        self.shared.end_run(&mut inner);
        debug!("transport destroyed");
    }

    /// Encodes `messages` as one frame and queues it.
    ///
    /// Never waits.  Returns `false` when the frame was dropped: silently
    /// while disconnected, with a debug log when the queue is full.  Callers
    /// that track what the receiver has seen must treat a dropped frame as
    /// unsent.
    pub fn send(&self, messages: &[ControlMessage]) -> bool {
        if messages.is_empty() {
            return true;
        }
        let Some(tx) = self.shared.lock().outbound.clone() else {
            trace!("not connected; {} message(s) dropped", messages.len());
            return false;
        };

        let payload = match Payload::encode(messages, self.shared.config.wire_format) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("could not encode batch: {e}");
                return false;
            }
        };

        match tx.try_send(payload) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                debug!("send queue full; frame dropped");
                false
            }
            Err(TrySendError::Closed(_)) => {
                trace!("connection closing; frame dropped");
                false
            }
        }
    }

    pub fn is_connected(&self) -> bool {
        self.shared.lock().state.phase() == Phase::Connected
    }

    /// Number of successful opens so far.
    pub fn connection_generation(&self) -> u64 {
        self.shared.generation.load(Ordering::SeqCst)
    }
}

impl Drop for TransportClient {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl ControlTransport for TransportClient {
    fn connect(&self) {
        TransportClient::connect(self);
    }

    fn disconnect(&self) {
        TransportClient::disconnect(self);
    }

    fn send(&self, messages: &[ControlMessage]) -> bool {
        TransportClient::send(self, messages)
    }

    fn is_connected(&self) -> bool {
        TransportClient::is_connected(self)
    }

    fn connection_generation(&self) -> u64 {
        TransportClient::connection_generation(self)
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, status: ConnectionStatus) {
        self.status_tx.send_if_modified(|current| {
            if *current == status {
                false
            } else {
                *current = status;
                true
            }
        });
    }

    /// Invalidates the current run and wakes its supervisor.
    fn end_run(&self, inner: &mut Inner) {
        inner.run_id += 1;
        inner.outbound = None;
        if let Some(tx) = inner.shutdown.take() {
            let _ = tx.send(true);
        }
        self.publish(inner.state.status());
    }

    /// The socket of run `run_id` opened.  Returns the queue to drain, or
    /// `None` if the run is no longer current.
    fn opened(&self, run_id: u64) -> Option<mpsc::Receiver<Payload>> {
        let mut inner = self.lock();
        if inner.run_id != run_id {
            return None;
        }
        inner.state.on_open();
        let (tx, rx) = mpsc::channel(self.config.send_queue.max(1));
        inner.outbound = Some(tx);
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.publish(inner.state.status());
        info!("connected to {} (generation {generation})", self.config.url);
        Some(rx)
    }

    fn errored(&self, run_id: u64) {
        let mut inner = self.lock();
        if inner.run_id != run_id {
            return;
        }
        inner.outbound = None;
        inner.state.on_error();
        self.publish(inner.state.status());
    }

    fn closed(&self, run_id: u64) -> Option<CloseAction> {
        let mut inner = self.lock();
        if inner.run_id != run_id {
            return None;
        }
        inner.outbound = None;
        let action = inner.state.on_close();
        self.publish(inner.state.status());
        Some(action)
    }

    fn reconnecting(&self, run_id: u64) -> bool {
        let mut inner = self.lock();
        if inner.run_id != run_id || !inner.state.begin_reconnect() {
            return false;
        }
        self.publish(inner.state.status());
        info!(
            "reconnecting to {} (attempt {}/{})",
            self.config.url,
            inner.state.reconnect_attempts(),
            self.config.max_reconnect_attempts
        );
        true
    }
}

// ── Supervisor task ───────────────────────────────────────────────────────────

enum SessionEnd {
    /// The client asked to stop.
    Shutdown,
    /// The connection dropped, with the error if it was not a clean close.
    Dropped(Option<TransportError>),
}

async fn supervise(shared: Arc<Shared>, run_id: u64, mut shutdown: watch::Receiver<bool>) {
    let url = shared.config.url.clone();

    loop {
        let attempt = tokio::select! {
            result = shared.connector.connect(&url) => result,
            _ = shutdown.changed() => return,
        };

        match attempt {
            Ok(mut conn) => {
                let Some(rx) = shared.opened(run_id) else {
                    conn.sink.close().await;
                    return;
                };
                match run_session(conn, rx, &mut shutdown).await {
                    SessionEnd::Shutdown => {
                        debug!("connection to {url} closed by client");
                        return;
                    }
                    SessionEnd::Dropped(None) => info!("connection to {url} closed"),
                    SessionEnd::Dropped(Some(e)) => {
                        warn!("connection to {url} lost: {e}");
                        shared.errored(run_id);
                    }
                }
            }
            Err(e) => {
                warn!("{e}");
                shared.errored(run_id);
            }
        }

        match shared.closed(run_id) {
            Some(CloseAction::Reconnect) => {}
            Some(CloseAction::Stop) => {
                warn!(
                    "giving up on {url} after {} reconnect attempts",
                    shared.config.max_reconnect_attempts
                );
                return;
            }
            None => return,
        }

        tokio::select! {
            _ = tokio::time::sleep(shared.config.reconnect_interval) => {}
            _ = shutdown.changed() => return,
        }

        if !shared.reconnecting(run_id) {
            return;
        }
    }
}

async fn run_session(
    mut conn: Connection,
    mut rx: mpsc::Receiver<Payload>,
    shutdown: &mut watch::Receiver<bool>,
) -> SessionEnd {
    loop {
        tokio::select! {
            next = rx.recv() => match next {
                Some(payload) => {
                    if let Err(e) = conn.sink.send(payload).await {
                        return SessionEnd::Dropped(Some(e));
                    }
                }
                None => {
                    conn.sink.close().await;
                    return SessionEnd::Shutdown;
                }
            },
            end = conn.source.closed() => return SessionEnd::Dropped(end),
            _ = shutdown.changed() => {
                conn.sink.close().await;
                return SessionEnd::Shutdown;
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
