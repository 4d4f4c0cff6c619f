//! The per-mapping transition function.
//!
//! [`step`] is pure: it looks at one mapping, the current snapshot of that
//! mapping's hand, and the entry left behind by the previous frame, and
//! returns the message to send (if any) plus the entry to keep.
//!
//! # Modes (for beginners)
//!
//! ```text
//! trigger  gesture seen ──► 1.0        (again only after the debounce window)
//! switch   gesture appears ──► toggle, send 1.0 / 0.0
//!          gesture held / absent ──► nothing
//! fader    gesture held ──► y   (only when it moved by ≥ threshold)
//! knob     gesture held ──► rot (only when it moved by ≥ threshold)
//! ```

use std::time::Instant;

use crate::domain::gesture::Mode;
use crate::domain::hand::GestureHandData;
use crate::domain::mapping::Mapping;
use crate::protocol::messages::ControlMessage;
use crate::streaming::StreamingConfig;

/// Runtime state kept per address between frames.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamingEntry {
    /// Last value actually sent (fader/knob).
    pub last_sent_value: Option<f32>,
    /// Current switch position.
    pub switch_state: bool,
    /// Whether the gesture matched on the previous frame.
    pub active: bool,
    /// When the last trigger pulse was sent.
    pub last_trigger_at: Option<Instant>,
    /// Exponential smoothing state, when smoothing is enabled.
    pub smoothed_value: Option<f32>,
    /// Last frame that evaluated this entry.
    pub last_seen: Instant,
}

impl StreamingEntry {
    /// A fresh entry: nothing sent, switch off, gesture inactive.
    pub fn new(now: Instant) -> Self {
        Self {
            last_sent_value: None,
            switch_state: false,
            active: false,
            last_trigger_at: None,
            smoothed_value: None,
            last_seen: now,
        }
    }
}

/// Evaluates one mapping for one frame.
///
/// Disabled mappings return `prior` untouched (or a fresh entry) and never
/// emit.
pub fn step(
    mapping: &Mapping,
    data: &GestureHandData,
    prior: Option<&StreamingEntry>,
    now: Instant,
    config: &StreamingConfig,
) -> (Option<ControlMessage>, StreamingEntry) {
    let mut entry = prior.cloned().unwrap_or_else(|| StreamingEntry::new(now));
    if !mapping.enabled() {
        return (None, entry);
    }
    entry.last_seen = now;

    let matched = data.gesture == Some(mapping.gesture());
    let was_active = entry.active;
    entry.active = matched;

    let value = match mapping.mode() {
        Mode::Trigger => trigger(&mut entry, matched, now, config),
        Mode::Switch => switch(&mut entry, matched, was_active),
        Mode::Fader => continuous(&mut entry, matched, data.y, config),
        Mode::Knob => continuous(&mut entry, matched, data.rot, config),
    };

    let message = value.map(|v| ControlMessage::new(mapping.address(), v));
    (message, entry)
}

fn trigger(
    entry: &mut StreamingEntry,
    matched: bool,
    now: Instant,
    config: &StreamingConfig,
) -> Option<f32> {
    if !matched {
        return None;
    }
    let ready = match entry.last_trigger_at {
        None => true,
        Some(at) => now.saturating_duration_since(at) > config.trigger_debounce,
    };
    if !ready {
        return None;
    }
    entry.last_trigger_at = Some(now);
    Some(1.0)
}

fn switch(entry: &mut StreamingEntry, matched: bool, was_active: bool) -> Option<f32> {
    if !matched || was_active {
        return None;
    }
    entry.switch_state = !entry.switch_state;
    Some(if entry.switch_state { 1.0 } else { 0.0 })
}

fn continuous(
    entry: &mut StreamingEntry,
    matched: bool,
    raw: f32,
    config: &StreamingConfig,
) -> Option<f32> {
    if !matched {
        return None;
    }

    let value = match config.smoothing {
        Some(alpha) => {
            let smoothed = match entry.smoothed_value {
                Some(prev) => raw * alpha + prev * (1.0 - alpha),
                None => raw,
            };
            entry.smoothed_value = Some(smoothed);
            smoothed
        }
        None => raw,
    };

    let significant = match entry.last_sent_value {
        None => true,
        Some(last) => (value - last).abs() >= config.value_threshold,
    };
    if !significant {
        return None;
    }
    entry.last_sent_value = Some(value);
    Some(value)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
