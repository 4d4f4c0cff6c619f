//! Landmark processor: 21 hand landmarks → normalized `y` / `rot` channels.
//!
//! The recognition engine reports each hand as 21 points in normalized image
//! coordinates (`x` to the right, `y` downwards, both in `[0, 1]`), following
//! the MediaPipe hand model numbering (0 = wrist, 5/9/13/17 = knuckles, 4, 8,
//! 12, 16, 20 = finger tips).
//!
//! Two scalars are derived per hand:
//!
//! - **`y`** – how high the palm is.  The palm centre is the mean of the wrist
//!   and the four knuckles; its height is rescaled from the comfortable
//!   operating band `[0.2, 0.6]` to `[0, 1]`.
//! - **`rot`** – how far the hand is tilted.  A reference axis is chosen per
//!   gesture (different poses extend different fingers, so the steadiest pair
//!   of points differs), its angle is mirrored for the left hand so the same
//!   on-screen rotation reads the same on both hands, and `±45°` is mapped
//!   onto `[0, 1]` with `0.5` upright.
//!
//! Both outputs are clamped and rounded to three decimals so that sub-pixel
//! jitter does not cross the streaming threshold.

use std::f32::consts::FRAC_PI_4;

use serde::{Deserialize, Serialize};

use crate::domain::gesture::{Gesture, Hand};

/// Number of landmarks in one hand.
pub const LANDMARK_COUNT: usize = 21;

/// Landmark indices (MediaPipe hand model numbering).
pub mod index {
    pub const WRIST: usize = 0;
    pub const THUMB_MCP: usize = 2;
    pub const THUMB_TIP: usize = 4;
    pub const INDEX_MCP: usize = 5;
    pub const INDEX_TIP: usize = 8;
    pub const MIDDLE_MCP: usize = 9;
    pub const RING_MCP: usize = 13;
    pub const PINKY_MCP: usize = 17;
}

/// Landmarks averaged to find the palm centre.
const PALM_INDICES: [usize; 5] = [
    index::WRIST,
    index::INDEX_MCP,
    index::MIDDLE_MCP,
    index::RING_MCP,
    index::PINKY_MCP,
];

/// Observed palm-height band mapped onto `[0, 1]`.
const MIN_Y: f32 = 0.2;
const MAX_Y: f32 = 0.6;

/// Tilt that maps to the ends of the `rot` range.
const MAX_ANGLE: f32 = FRAC_PI_4;

/// One landmark in normalized image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub z: f32,
}

impl Landmark {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y, z: 0.0 }
    }
}

/// All 21 landmarks of one hand.
///
/// A fixed-size array keeps every index in [`index`] in bounds by
/// construction, so the processor needs no runtime bounds checks.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HandLandmarks(pub [Landmark; LANDMARK_COUNT]);

impl HandLandmarks {
    fn point(&self, i: usize) -> Landmark {
        self.0[i]
    }
}

/// The two channels derived from one hand.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct HandChannels {
    pub y: f32,
    pub rot: f32,
}

/// The pair of landmarks whose direction defines a hand's tilt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceAxis {
    /// Runs across the palm, from the index side towards the pinky side.
    Across(usize, usize),
    /// Runs along the hand, from the base towards the fingers.
    Along(usize, usize),
}

/// Chooses the reference axis for a gesture.
///
/// Flat-hand poses use the knuckle line; poses with a single extended digit
/// follow that digit; anything unrecognized falls back to wrist → middle
/// knuckle, which is visible in every pose.
pub fn reference_axis(gesture: Option<Gesture>) -> ReferenceAxis {
    match gesture {
        Some(Gesture::OpenPalm | Gesture::ClosedFist | Gesture::Victory | Gesture::ILoveYou) => {
            ReferenceAxis::Across(index::INDEX_MCP, index::PINKY_MCP)
        }
        Some(Gesture::PointingUp) => ReferenceAxis::Along(index::INDEX_MCP, index::INDEX_TIP),
        Some(Gesture::ThumbUp | Gesture::ThumbDown) => {
            ReferenceAxis::Along(index::THUMB_MCP, index::THUMB_TIP)
        }
        None => ReferenceAxis::Along(index::WRIST, index::MIDDLE_MCP),
    }
}

/// Derives the `y` / `rot` channels for one hand.
///
/// Pure function: same landmarks, hand, and gesture always give the same
/// channels.
pub fn process_hand_landmarks(
    landmarks: &HandLandmarks,
    hand: Hand,
    gesture: Option<Gesture>,
) -> HandChannels {
    HandChannels {
        y: palm_height(landmarks),
        rot: tilt(landmarks, hand, gesture),
    }
}

fn palm_height(landmarks: &HandLandmarks) -> f32 {
    let sum: f32 = PALM_INDICES.iter().map(|&i| landmarks.point(i).y).sum();
    let avg_y = sum / PALM_INDICES.len() as f32;

    // Image y grows downwards; flip so that raising the hand raises the value.
    let height = 1.0 - avg_y;
    let scaled = (height - MIN_Y) / (MAX_Y - MIN_Y);
    round3(scaled.clamp(0.0, 1.0))
}

fn tilt(landmarks: &HandLandmarks, hand: Hand, gesture: Option<Gesture>) -> f32 {
    let is_left = hand == Hand::Left;

    let (dx, dy) = match reference_axis(gesture) {
        ReferenceAxis::Across(a, b) => delta(landmarks, a, b),
        ReferenceAxis::Along(a, b) => {
            // Quarter turn towards the pinky side turns an along-the-hand axis
            // into the across-the-palm direction with the same neutral angle.
            let (dx, dy) = delta(landmarks, a, b);
            if is_left {
                (-dy, dx)
            } else {
                (dy, -dx)
            }
        }
    };

    let mut angle = dy.atan2(if is_left { dx } else { -dx });
    if is_left {
        angle = -angle;
    }

    let normalized = (angle / MAX_ANGLE + 1.0) / 2.0;
    round3(normalized.clamp(0.0, 1.0))
}

fn delta(landmarks: &HandLandmarks, from: usize, to: usize) -> (f32, f32) {
    let a = landmarks.point(from);
    let b = landmarks.point(to);
    (b.x - a.x, b.y - a.y)
}

fn round3(v: f32) -> f32 {
    (v * 1000.0).round() / 1000.0
}

// ── Tests ─────────────────────────────────────────────────────────────────────
