//! DetectionLoopUseCase: the per-frame pipeline.
//!
//! ```text
//! TickSource ──tick──► Recognizer ──hands──► build_frame ──HandFrame──► HandStreamer ──► transport
//!                                                 ▲
//!                                       process_hand_landmarks
//! ```
//!
//! # The loop (for beginners)
//!
//! One [`Pipeline`] runs one Tokio task.  Each iteration waits for the next
//! tick (display refresh, fixed interval, or a scripted list in tests), asks
//! the recognizer for the hands in the current image, converts them into a
//! [`HandFrame`], and passes it to the [`HandStreamer`].  Nothing in the loop
//! waits on the network: sending only enqueues.
//!
//! The mapping store is shared behind an async `RwLock` because UI-side code
//! edits it while the loop reads it once per frame.  The streaming table is
//! owned by the streamer inside the loop task, so no other task can touch it.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use aether_core::{
    process_hand_landmarks, Gesture, GestureHandData, Hand, HandFrame, HandLandmarks, MappingId,
    MappingStore, StreamingConfig,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::application::stream_hands::{ControlTransport, HandStreamer, LiveValues};

// ── Ports ─────────────────────────────────────────────────────────────────────

/// Errors reported by a recognizer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RecognizerError {
    /// The recognizer could not be set up; no frame will ever be produced.
    #[error("recognizer initialization failed: {0}")]
    Initialization(String),

    /// The recognizer has no more frames (end of a recording).
    #[error("recognizer exhausted")]
    Exhausted,

    /// This frame could not be recognized; later frames may succeed.
    #[error("recognition failed: {0}")]
    Frame(String),
}

/// One hand reported by the recognition engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedHand {
    /// Engine handedness label (`"Left"` / `"Right"`).
    pub handedness: String,
    /// Engine gesture label, `"None"` when unclassified.
    #[serde(default)]
    pub gesture: Option<String>,
    /// Classifier confidence for `gesture`.
    #[serde(default)]
    pub score: f32,
    pub landmarks: HandLandmarks,
}

/// Everything the engine found in one image.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RecognitionResult {
    #[serde(default)]
    pub hands: Vec<DetectedHand>,
}

/// The gesture/landmark recognition engine.
#[cfg_attr(test, mockall::automock)]
pub trait Recognizer: Send {
    /// Prepares the engine (load a model, open a recording).
    ///
    /// Called once by [`Pipeline::start`] before any frame.
    fn initialize(&mut self) -> Result<(), RecognizerError> {
        Ok(())
    }

    /// Recognizes the hands visible at `at`.
    fn recognize(&mut self, at: Instant) -> Result<RecognitionResult, RecognizerError>;
}

/// Decides when the next frame runs.
#[async_trait]
pub trait TickSource: Send {
    /// Waits for the next tick; `None` ends the loop.
    async fn next_tick(&mut self) -> Option<Instant>;
}

// ── Frame building ────────────────────────────────────────────────────────────

/// Tunables for the detection loop.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Gestures classified below this score are treated as no gesture.
    pub min_gesture_score: f32,
    pub streaming: StreamingConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            min_gesture_score: 0.0,
            streaming: StreamingConfig::default(),
        }
    }
}

/// Converts one recognition result into a [`HandFrame`].
///
/// - Hands without a recognized gesture, or not detected at all, are idle.
/// - A gesture below `min_gesture_score` counts as no gesture.
/// - If the engine reports the same hand twice, the first detection wins.
pub fn build_frame(result: &RecognitionResult, min_gesture_score: f32) -> HandFrame {
    let mut frame = HandFrame::idle();
    let mut seen: Vec<Hand> = Vec::with_capacity(2);

    for detected in &result.hands {
        let Some(hand) = Hand::from_label(&detected.handedness) else {
            debug!("ignoring hand with unknown handedness {:?}", detected.handedness);
            continue;
        };
        if seen.contains(&hand) {
            continue;
        }
        seen.push(hand);

        let gesture = detected
            .gesture
            .as_deref()
            .and_then(Gesture::from_label)
            .filter(|_| detected.score >= min_gesture_score);

        let data = match gesture {
            Some(g) => {
                let ch = process_hand_landmarks(&detected.landmarks, hand, Some(g));
                GestureHandData::new(g, ch.y, ch.rot)
            }
            None => GestureHandData::idle(),
        };
        frame.set(hand, data);
    }

    frame
}

// ── Pipeline ──────────────────────────────────────────────────────────────────

/// Errors returned when starting a pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Recognizer(#[from] RecognizerError),
}

/// Why the frame loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// The tick source or the recognizer ran out.
    Finished,
    /// `stop` cleared the running flag.
    Stopped,
    /// The recognizer reported a fatal error mid-run.
    Failed,
}

/// Counters reported when the loop ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopSummary {
    pub exit: LoopExit,
    /// Frames recognized and streamed.
    pub frames: u64,
    /// Frames the recognizer failed on.
    pub skipped: u64,
    /// Control messages handed to the transport.
    pub messages: u64,
}

/// A running detection loop.
pub struct Pipeline {
    running: Arc<AtomicBool>,
    task: Option<JoinHandle<LoopSummary>>,
    transport: Arc<dyn ControlTransport>,
    live: LiveValues,
}

impl Pipeline {
    /// Initializes the recognizer, connects the transport, and spawns the
    /// frame loop.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Recognizer`] if the recognizer fails to
    /// initialize; the transport is left untouched in that case.
    pub fn start(
        mut recognizer: Box<dyn Recognizer>,
        ticks: Box<dyn TickSource>,
        store: Arc<RwLock<MappingStore>>,
        transport: Arc<dyn ControlTransport>,
        config: PipelineConfig,
    ) -> Result<Pipeline, PipelineError> {
        recognizer.initialize()?;

        transport.connect();

        let running = Arc::new(AtomicBool::new(true));
        let live = LiveValues::new();
        let streamer = HandStreamer::new(Arc::clone(&transport), config.streaming.clone(), live.clone());

        let task = tokio::spawn(run_loop(
            recognizer,
            ticks,
            store,
            streamer,
            config.min_gesture_score,
            Arc::clone(&running),
        ));
        info!("detection pipeline started");

        Ok(Pipeline {
            running,
            task: Some(task),
            transport,
            live,
        })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Latest value emitted per mapping.
    pub fn live_values(&self) -> HashMap<MappingId, f32> {
        self.live.snapshot()
    }

    /// Waits for the loop to end on its own (tick source or recognizer
    /// exhausted).
    ///
    /// Returns `None` if the loop was already stopped, aborted, or joined.
    pub async fn join(&mut self) -> Option<LoopSummary> {
        let task = self.task.take()?;
        let summary = task.await.ok();
        self.running.store(false, Ordering::SeqCst);
        summary
    }

    /// Stops the loop, disconnects the transport, and clears streaming
    /// state.  Safe to call more than once.
    pub fn stop(&mut self) {
        let was_running = self.running.swap(false, Ordering::SeqCst);
        if let Some(task) = self.task.take() {
            // Dropping the task drops the streamer and its table.
            task.abort();
        }
        self.transport.disconnect();
        self.live.clear();
        if was_running {
            info!("detection pipeline stopped");
        }
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn run_loop(
    mut recognizer: Box<dyn Recognizer>,
    mut ticks: Box<dyn TickSource>,
    store: Arc<RwLock<MappingStore>>,
    mut streamer: HandStreamer,
    min_gesture_score: f32,
    running: Arc<AtomicBool>,
) -> LoopSummary {
    let mut summary = LoopSummary {
        exit: LoopExit::Finished,
        frames: 0,
        skipped: 0,
        messages: 0,
    };

    loop {
        let Some(now) = ticks.next_tick().await else {
            debug!("tick source ended");
            break;
        };
        if !running.load(Ordering::SeqCst) {
            summary.exit = LoopExit::Stopped;
            break;
        }

        let result = match recognizer.recognize(now) {
            Ok(result) => result,
            Err(RecognizerError::Exhausted) => {
                info!("recognizer exhausted after {} frames", summary.frames);
                break;
            }
            Err(e @ RecognizerError::Initialization(_)) => {
                error!("{e}");
                summary.exit = LoopExit::Failed;
                break;
            }
            Err(e) => {
                warn!("frame skipped: {e}");
                summary.skipped += 1;
                continue;
            }
        };

        let frame = build_frame(&result, min_gesture_score);
        let sent = {
            let store = store.read().await;
            streamer.process_frame(&frame, &store, now)
        };
        summary.frames += 1;
        summary.messages += sent as u64;
    }

    streamer.reset();
    running.store(false, Ordering::SeqCst);
    summary
}

// ── Tests ─────────────────────────────────────────────────────────────────────
