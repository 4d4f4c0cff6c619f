//! Persistent storage for the client: configuration and mappings.

pub mod config;
