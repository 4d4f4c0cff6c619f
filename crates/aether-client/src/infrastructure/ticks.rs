//! Tick sources for the detection loop.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::time::{interval, Interval, MissedTickBehavior};

use crate::application::detection_loop::TickSource;

/// Fixed-rate ticks.  A slow frame skips ticks instead of bursting to catch
/// up, so the loop never processes stale images back to back.
pub struct IntervalTicks {
    interval: Interval,
}

impl IntervalTicks {
    /// Must be called from within a Tokio runtime.
    pub fn new(period: Duration) -> Self {
        let mut interval = interval(period.max(Duration::from_millis(1)));
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Self { interval }
    }

    /// Ticks `fps` times per second (at least once).
    pub fn from_fps(fps: u32) -> Self {
        Self::new(Duration::from_secs(1) / fps.max(1))
    }
}

#[async_trait]
impl TickSource for IntervalTicks {
    async fn next_tick(&mut self) -> Option<Instant> {
        Some(self.interval.tick().await.into_std())
    }
}

/// A fixed list of timestamps, delivered without waiting.
///
/// Lets tests drive the loop through exact frame times.
#[derive(Debug, Clone, Default)]
pub struct ScriptedTicks {
    ticks: VecDeque<Instant>,
}

impl ScriptedTicks {
    pub fn new(ticks: impl IntoIterator<Item = Instant>) -> Self {
        Self {
            ticks: ticks.into_iter().collect(),
        }
    }

    /// `count` ticks `step` apart starting at `start`.
    pub fn evenly(start: Instant, step: Duration, count: u32) -> Self {
        Self::new((0..count).map(move |i| start + step * i))
    }

    pub fn remaining(&self) -> usize {
        self.ticks.len()
    }
}

#[async_trait]
impl TickSource for ScriptedTicks {
    async fn next_tick(&mut self) -> Option<Instant> {
        self.ticks.pop_front()
    }
}
