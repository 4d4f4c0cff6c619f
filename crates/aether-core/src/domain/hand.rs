//! Per-frame hand snapshots.

use serde::{Deserialize, Serialize};

use crate::domain::gesture::{Gesture, Hand};

/// What one hand is doing in the current frame.
///
/// Produced fresh every processed frame and never persisted.  A hand that is
/// not visible, or visible without a recognized gesture, is reported as
/// [`GestureHandData::idle`].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GestureHandData {
    /// The recognized gesture, or `None` for the engine's "None" sentinel.
    pub gesture: Option<Gesture>,
    /// Normalized vertical position in `[0, 1]` (1 = top of the range).
    pub y: f32,
    /// Normalized rotation in `[0, 1]` (0.5 = upright).
    pub rot: f32,
}

impl GestureHandData {
    /// The snapshot of a hand with no recognized gesture.
    pub const fn idle() -> Self {
        Self {
            gesture: None,
            y: 0.0,
            rot: 0.0,
        }
    }

    /// Snapshot of a hand making `gesture` with the given channels.
    pub const fn new(gesture: Gesture, y: f32, rot: f32) -> Self {
        Self {
            gesture: Some(gesture),
            y,
            rot,
        }
    }
}

/// Both hands for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct HandFrame {
    pub left: GestureHandData,
    pub right: GestureHandData,
}

impl HandFrame {
    /// A frame in which neither hand shows a gesture.
    pub const fn idle() -> Self {
        Self {
            left: GestureHandData::idle(),
            right: GestureHandData::idle(),
        }
    }

    /// Returns the snapshot for `hand`.
    pub fn get(&self, hand: Hand) -> &GestureHandData {
        match hand {
            Hand::Left => &self.left,
            Hand::Right => &self.right,
        }
    }

    /// Replaces the snapshot for `hand`.
    pub fn set(&mut self, hand: Hand, data: GestureHandData) {
        match hand {
            Hand::Left => self.left = data,
            Hand::Right => self.right = data,
        }
    }
}
