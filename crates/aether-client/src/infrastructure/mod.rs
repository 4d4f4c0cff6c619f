//! Infrastructure layer: adapters for the application-layer ports.

pub mod network;
pub mod recognizer;
pub mod storage;
pub mod ticks;
