//! Domain layer for aether-bridge.

pub mod config;

pub use config::BridgeConfig;
