//! Streaming engine: decides, frame by frame, which values are worth sending.
//!
//! The engine owns one [`StreamingEntry`] per output address and applies the
//! pure [`step`] function to every enabled mapping in list order.  Keying by
//! address (not by mapping id) means two mappings that resolve to the same
//! address share one entry, so the receiver sees a single merged stream.
//!
//! # Lifecycle of an entry
//!
//! - Created lazily the first time an enabled mapping with that address is
//!   evaluated.
//! - Removed by [`StreamingEngine::retain_addresses`] once no mapping uses the
//!   address any more.
//! - Removed by [`StreamingEngine::prune_stale`] when only disabled mappings
//!   use it and it has been idle for longer than
//!   [`StreamingConfig::stale_after`].
//! - Dropped wholesale by [`StreamingEngine::clear`] (new connection, stop).
//! - Put back to its pre-frame value by [`StreamingEngine::revert_last`]
//!   when the frame's batch never left the process.

mod step;

pub use step::{step, StreamingEntry};

use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use crate::domain::hand::HandFrame;
use crate::domain::mapping::{Mapping, MappingId};
use crate::protocol::messages::ControlMessage;

/// Default smoothing factor when smoothing is switched on.
pub const DEFAULT_SMOOTHING: f32 = 0.2;

/// Tunables for the streaming state machine.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamingConfig {
    /// Minimum change before a fader/knob value is re-sent.
    pub value_threshold: f32,
    /// Minimum gap between two trigger pulses on one address.
    pub trigger_debounce: Duration,
    /// Exponential smoothing factor `α` for fader/knob values, or `None`.
    pub smoothing: Option<f32>,
    /// Idle time after which entries of disabled mappings are dropped.
    pub stale_after: Duration,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            value_threshold: 0.001,
            trigger_debounce: Duration::from_millis(400),
            smoothing: None,
            stale_after: Duration::from_secs(30),
        }
    }
}

/// A message produced for a specific mapping.
#[derive(Debug, Clone, PartialEq)]
pub struct Emission {
    pub mapping_id: MappingId,
    pub message: ControlMessage,
}

/// Owner of the per-address streaming table.
#[derive(Debug, Default)]
pub struct StreamingEngine {
    config: StreamingConfig,
    entries: HashMap<String, StreamingEntry>,
    /// Pre-frame entries of the addresses the last `process` call emitted on.
    undo: Vec<(String, Option<StreamingEntry>)>,
}

impl StreamingEngine {
    pub fn new(config: StreamingConfig) -> Self {
        Self {
            config,
            entries: HashMap::new(),
            undo: Vec::new(),
        }
    }

    pub fn config(&self) -> &StreamingConfig {
        &self.config
    }

    /// Evaluates every enabled mapping against `frame`.
    ///
    /// Emissions come out in mapping order.
    pub fn process(&mut self, frame: &HandFrame, mappings: &[Mapping], now: Instant) -> Vec<Emission> {
        let mut out = Vec::new();
        let mut before: HashMap<&str, Option<StreamingEntry>> = HashMap::new();
        let mut emitted: HashSet<&str> = HashSet::new();
        for mapping in mappings.iter().filter(|m| m.enabled()) {
            let address = mapping.address();
            let data = frame.get(mapping.hand());
            let prior = self.entries.get(address);
            before.entry(address).or_insert_with(|| prior.cloned());
            let (message, entry) = step(mapping, data, prior, now, &self.config);
            self.entries.insert(address.to_string(), entry);
            if let Some(message) = message {
                emitted.insert(address);
                out.push(Emission {
                    mapping_id: mapping.id(),
                    message,
                });
            }
        }
        self.undo = before
            .into_iter()
            .filter(|(address, _)| emitted.contains(address))
            .map(|(address, entry)| (address.to_string(), entry))
            .collect();
        out
    }

    /// Undoes the last [`process`] call for every address it emitted on.
    ///
    /// Used when the batch could not be handed to the transport: the next
    /// frame then sees the same prior state and emits again (a held fader
    /// resends its value, a held switch repeats its flip).  Returns the
    /// number of addresses restored; a second call restores nothing.
    ///
    /// [`process`]: StreamingEngine::process
    pub fn revert_last(&mut self) -> usize {
        let restored = self.undo.len();
        for (address, entry) in self.undo.drain(..) {
            match entry {
                Some(entry) => {
                    self.entries.insert(address, entry);
                }
                None => {
                    self.entries.remove(&address);
                }
            }
        }
        restored
    }

    /// The entry for `address`, if one exists.
    pub fn entry(&self, address: &str) -> Option<&StreamingEntry> {
        self.entries.get(address)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops entries whose address is not used by any of `mappings`.
    ///
    /// Returns the number of entries removed.
    pub fn retain_addresses(&mut self, mappings: &[Mapping]) -> usize {
        let valid: HashSet<&str> = mappings.iter().map(|m| m.address()).collect();
        let before = self.entries.len();
        self.entries.retain(|address, _| valid.contains(address.as_str()));
        before - self.entries.len()
    }

    /// Drops entries no enabled mapping uses that have been idle longer than
    /// `stale_after`.
    ///
    /// Returns the number of entries removed.
    pub fn prune_stale(&mut self, mappings: &[Mapping], now: Instant) -> usize {
        let live: HashSet<&str> = mappings
            .iter()
            .filter(|m| m.enabled())
            .map(|m| m.address())
            .collect();
        let stale_after = self.config.stale_after;
        let before = self.entries.len();
        self.entries.retain(|address, entry| {
            live.contains(address.as_str())
                || now.saturating_duration_since(entry.last_seen) <= stale_after
        });
        before - self.entries.len()
    }

    /// Forgets all state, as if no frame had ever been processed.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.undo.clear();
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
