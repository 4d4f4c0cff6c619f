//! Domain layer: pure types and transition functions with no I/O.
//!
//! - [`gesture`] – hands, the closed gesture vocabulary, and mapping modes.
//! - [`hand`] – the per-frame snapshot of both hands.
//! - [`landmarks`] – landmark geometry to `y` / `rot` channels.
//! - [`mapping`] – the user-authored routing rules and the ordered store.

pub mod gesture;
pub mod hand;
pub mod landmarks;
pub mod mapping;
