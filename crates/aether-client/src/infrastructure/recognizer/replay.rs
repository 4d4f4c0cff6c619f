//! Replay recognizer: recorded recognition results, one JSON object per line.
//!
//! ```text
//! {"hands":[{"handedness":"Right","gesture":"Open_Palm","score":0.93,"landmarks":[{"x":0.51,"y":0.62}, ...]}]}
//! {"hands":[]}
//! ```
//!
//! Each call to `recognize` returns the next line regardless of the tick
//! time, so playback speed is set by the tick source.  Blank lines are
//! skipped; a malformed line fails that frame only.

use std::collections::VecDeque;
use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use tracing::{debug, info};

use crate::application::detection_loop::{RecognitionResult, Recognizer, RecognizerError};

enum Source {
    File(PathBuf),
    Inline,
}

/// Plays back a JSON-lines recording.
pub struct ReplayRecognizer {
    source: Source,
    lines: VecDeque<(usize, String)>,
    loaded: bool,
}

impl ReplayRecognizer {
    /// A recognizer reading `path` when initialized.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            source: Source::File(path.into()),
            lines: VecDeque::new(),
            loaded: false,
        }
    }

    /// A recognizer over in-memory lines.
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            source: Source::Inline,
            lines: numbered(lines.into_iter().map(Into::into)),
            loaded: true,
        }
    }

    /// Frames left to play back.
    pub fn remaining(&self) -> usize {
        self.lines.len()
    }
}

fn numbered(lines: impl Iterator<Item = String>) -> VecDeque<(usize, String)> {
    lines
        .enumerate()
        .map(|(i, line)| (i + 1, line))
        .filter(|(_, line)| !line.trim().is_empty())
        .collect()
}

impl Recognizer for ReplayRecognizer {
    fn initialize(&mut self) -> Result<(), RecognizerError> {
        let Source::File(path) = &self.source else {
            return Ok(());
        };
        let text = fs::read_to_string(path).map_err(|e| {
            RecognizerError::Initialization(format!("cannot read replay {}: {e}", path.display()))
        })?;
        self.lines = numbered(text.lines().map(str::to_string));
        self.loaded = true;
        info!("loaded {} frames from {}", self.lines.len(), path.display());
        Ok(())
    }

    fn recognize(&mut self, _at: Instant) -> Result<RecognitionResult, RecognizerError> {
        if !self.loaded {
            return Err(RecognizerError::Initialization(
                "replay recognizer used before initialize".to_string(),
            ));
        }
        let Some((line_no, line)) = self.lines.pop_front() else {
            return Err(RecognizerError::Exhausted);
        };
        serde_json::from_str(&line).map_err(|e| {
            debug!("replay line {line_no} rejected");
            RecognizerError::Frame(format!("line {line_no}: {e}"))
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
