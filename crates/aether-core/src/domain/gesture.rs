//! Hands, the gesture vocabulary, and mapping modes.
//!
//! # The gesture vocabulary
//!
//! The recognition engine classifies each detected hand into one of a fixed
//! set of labels.  The *position* of a gesture in [`Gesture::ALL`] is part of
//! the OSC address scheme (`/right/0/fader` means "right hand, Open_Palm,
//! fader"), so the order below must never change.
//!
//! The engine also reports the sentinel label `"None"` when it sees a hand but
//! cannot classify the pose.  That sentinel is not a [`Gesture`]: it is
//! modelled as `Option<Gesture>::None` wherever a "gesture or nothing" value
//! is needed.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Which hand a mapping listens to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Hand {
    Left,
    Right,
}

impl Hand {
    /// Both hands, in the order the frame loop processes them.
    pub const BOTH: [Hand; 2] = [Hand::Left, Hand::Right];

    /// Lowercase name used in addresses (`left` / `right`).
    pub fn as_str(self) -> &'static str {
        match self {
            Hand::Left => "left",
            Hand::Right => "right",
        }
    }

    /// Parses a handedness label as reported by the recognition engine.
    ///
    /// The engine reports `"Left"` / `"Right"`; matching is case-insensitive.
    pub fn from_label(label: &str) -> Option<Hand> {
        if label.eq_ignore_ascii_case("left") {
            Some(Hand::Left)
        } else if label.eq_ignore_ascii_case("right") {
            Some(Hand::Right)
        } else {
            None
        }
    }
}

impl fmt::Display for Hand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recognizable hand pose.
///
/// Serialized with the engine's own labels (`"Open_Palm"`, `"ILoveYou"`, ...)
/// so recorded recognition output and persisted mappings read naturally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gesture {
    #[serde(rename = "Open_Palm")]
    OpenPalm,
    #[serde(rename = "Closed_Fist")]
    ClosedFist,
    #[serde(rename = "Pointing_Up")]
    PointingUp,
    #[serde(rename = "Victory")]
    Victory,
    #[serde(rename = "Thumb_Up")]
    ThumbUp,
    #[serde(rename = "Thumb_Down")]
    ThumbDown,
    #[serde(rename = "ILoveYou")]
    ILoveYou,
}

impl Gesture {
    /// The full vocabulary in address-index order.
    pub const ALL: [Gesture; 7] = [
        Gesture::OpenPalm,
        Gesture::ClosedFist,
        Gesture::PointingUp,
        Gesture::Victory,
        Gesture::ThumbUp,
        Gesture::ThumbDown,
        Gesture::ILoveYou,
    ];

    /// Label reported by the engine for "hand seen, no gesture".
    pub const NONE_LABEL: &'static str = "None";

    /// Position of this gesture in [`Gesture::ALL`].
    pub fn index(self) -> usize {
        match self {
            Gesture::OpenPalm => 0,
            Gesture::ClosedFist => 1,
            Gesture::PointingUp => 2,
            Gesture::Victory => 3,
            Gesture::ThumbUp => 4,
            Gesture::ThumbDown => 5,
            Gesture::ILoveYou => 6,
        }
    }

    /// The engine label for this gesture.
    pub fn label(self) -> &'static str {
        match self {
            Gesture::OpenPalm => "Open_Palm",
            Gesture::ClosedFist => "Closed_Fist",
            Gesture::PointingUp => "Pointing_Up",
            Gesture::Victory => "Victory",
            Gesture::ThumbUp => "Thumb_Up",
            Gesture::ThumbDown => "Thumb_Down",
            Gesture::ILoveYou => "ILoveYou",
        }
    }

    /// Parses an engine label.
    ///
    /// Returns `None` both for the `"None"` sentinel and for labels outside the
    /// vocabulary; downstream logic treats the two the same way.
    pub fn from_label(label: &str) -> Option<Gesture> {
        Gesture::ALL.into_iter().find(|g| g.label() == label)
    }
}

impl fmt::Display for Gesture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// How a mapping turns a hand's channels into an output value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Sends `1.0` when the gesture appears, at most once per debounce window.
    Trigger,
    /// Follows the hand's vertical position (`y`).
    Fader,
    /// Follows the hand's rotation (`rot`).
    Knob,
    /// Toggles between `1.0` and `0.0` on every new appearance of the gesture.
    Switch,
}

impl Mode {
    /// Lowercase name used in addresses.
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Trigger => "trigger",
            Mode::Fader => "fader",
            Mode::Knob => "knob",
            Mode::Switch => "switch",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
