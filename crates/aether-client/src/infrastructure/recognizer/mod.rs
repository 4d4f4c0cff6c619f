//! Recognizer adapters.
//!
//! Live camera recognition runs outside this process; the client consumes
//! its output through the [`Recognizer`] port.  [`ReplayRecognizer`] plays
//! back a recorded session so the whole pipeline can run headless.
//!
//! [`Recognizer`]: crate::application::detection_loop::Recognizer

pub mod replay;

pub use replay::ReplayRecognizer;
