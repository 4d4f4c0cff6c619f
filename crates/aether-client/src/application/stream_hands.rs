//! HandStreamerUseCase: hand frames → control messages on the wire.
//!
//! The streamer owns the [`StreamingEngine`] (the per-address table of
//! last-sent values, switch states, and trigger times) and a transport
//! through which the resulting messages leave the process.
//!
//! # State resynchronization
//!
//! The receiver keeps no history of its own, so after a reconnect it may be
//! out of date.  The transport bumps a *connection generation* number on
//! every successful open; when the streamer sees a new generation it clears
//! its table, which makes every fader/knob resend its current value on the
//! next frame.
//!
//! # Mapping changes
//!
//! The streamer remembers the [`MappingStore::revision`] it last saw.  When
//! the revision moves, entries for addresses that no mapping uses any more
//! are dropped, and so are live values for deleted mappings.
//!
//! # Rejected batches
//!
//! When the transport refuses a batch (its send queue is full), the engine
//! is rolled back for the addresses in that batch.  The next frame is then
//! compared against what the receiver actually has, so a held value or a
//! switch flip goes out again instead of being filtered as already sent.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use aether_core::{ControlMessage, HandFrame, MappingId, MappingStore, StreamingConfig, StreamingEngine};
use tracing::{debug, trace};

/// Outbound side of the client, as seen by the application layer.
///
/// Every method is non-blocking: sending hands a frame to a queue and
/// returns, connecting starts a background task.
pub trait ControlTransport: Send + Sync {
    /// Starts connecting (no-op when already connected or connecting).
    fn connect(&self);

    /// Closes the connection and cancels any pending reconnect.
    fn disconnect(&self);

    /// Queues a batch for sending.
    ///
    /// Returns `false` when the batch was dropped (disconnected, or the send
    /// queue is full).  An empty batch counts as accepted.
    fn send(&self, messages: &[ControlMessage]) -> bool;

    /// Whether a connection is currently open.
    fn is_connected(&self) -> bool;

    /// Incremented on every successful open.
    fn connection_generation(&self) -> u64;
}

/// Latest value emitted per mapping, shared with UI-side readers.
#[derive(Debug, Clone, Default)]
pub struct LiveValues {
    inner: Arc<Mutex<HashMap<MappingId, f32>>>,
}

impl LiveValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the current values.
    pub fn snapshot(&self) -> HashMap<MappingId, f32> {
        self.lock().clone()
    }

    pub fn get(&self, id: MappingId) -> Option<f32> {
        self.lock().get(&id).copied()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn record(&self, id: MappingId, value: f32) {
        self.lock().insert(id, value);
    }

    fn retain_ids(&self, store: &MappingStore) {
        self.lock().retain(|id, _| store.get(*id).is_some());
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<MappingId, f32>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Turns processed hand frames into messages sent over a [`ControlTransport`].
pub struct HandStreamer {
    transport: Arc<dyn ControlTransport>,
    engine: StreamingEngine,
    live: LiveValues,
    seen_generation: u64,
    seen_revision: Option<u64>,
}

impl HandStreamer {
    pub fn new(transport: Arc<dyn ControlTransport>, config: StreamingConfig, live: LiveValues) -> Self {
        Self {
            transport,
            engine: StreamingEngine::new(config),
            live,
            seen_generation: 0,
            seen_revision: None,
        }
    }

    /// Runs one frame through every enabled mapping and sends the result.
    ///
    /// Returns the number of messages handed to the transport.  Nothing is
    /// evaluated while the transport is disconnected, and a batch the
    /// transport rejects is rolled back, so no value is recorded as "sent"
    /// unless it was actually queued.
    pub fn process_frame(&mut self, frame: &HandFrame, store: &MappingStore, now: Instant) -> usize {
        self.sync_with_store(store, now);

        if !self.transport.is_connected() {
            trace!("frame skipped: transport not connected");
            return 0;
        }

        let generation = self.transport.connection_generation();
        if generation != self.seen_generation {
            debug!("connection generation {generation}: resending current values");
            self.engine.clear();
            self.seen_generation = generation;
        }

        let emissions = self.engine.process(frame, store.mappings(), now);
        if emissions.is_empty() {
            return 0;
        }

        let messages: Vec<ControlMessage> = emissions.iter().map(|e| e.message.clone()).collect();
        if !self.transport.send(&messages) {
            let restored = self.engine.revert_last();
            debug!("batch rejected by transport; {restored} address(es) rolled back");
            return 0;
        }
        for e in &emissions {
            self.live.record(e.mapping_id, e.message.value);
        }
        messages.len()
    }

    /// Read access to the streaming table.
    pub fn engine(&self) -> &StreamingEngine {
        &self.engine
    }

    pub fn live_values(&self) -> &LiveValues {
        &self.live
    }

    /// Forgets all streaming state and live values.
    pub fn reset(&mut self) {
        self.engine.clear();
        self.live.clear();
        self.seen_revision = None;
    }

    fn sync_with_store(&mut self, store: &MappingStore, now: Instant) {
        if self.seen_revision != Some(store.revision()) {
            let removed = self.engine.retain_addresses(store.mappings());
            if removed > 0 {
                debug!("dropped {removed} streaming entries for removed addresses");
            }
            self.live.retain_ids(store);
            self.seen_revision = Some(store.revision());
        }
        let stale = self.engine.prune_stale(store.mappings(), now);
        if stale > 0 {
            debug!("dropped {stale} stale streaming entries");
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
