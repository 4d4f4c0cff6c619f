//! TOML-based configuration persistence for the tracking client.
//!
//! Reads and writes [`ClientConfig`] to the platform-appropriate config file:
//! - Windows:  `%APPDATA%\Aether\config.toml`
//! - Linux:    `~/.config/aether/config.toml`
//! - macOS:    `~/Library/Application Support/Aether/config.toml`
//!
//! ```toml
//! [client]
//! log_level = "info"
//!
//! [transport]
//! url = "ws://127.0.0.1:8888"
//! reconnect_interval_ms = 3000
//! max_reconnect_attempts = 5
//! wire_format = "binary"
//!
//! [streaming]
//! value_threshold = 0.001
//! trigger_debounce_ms = 400
//! # smoothing = 0.2
//!
//! [[mappings]]
//! id = "7f0c4c1e-8a65-4d8a-9d0e-3f1a2b4c5d6e"
//! enabled = true
//! hand = "right"
//! gesture = "Open_Palm"
//! mode = "fader"
//! ```
//!
//! Every field has a `#[serde(default = ...)]`, so a partial file (or none at
//! all) yields a working configuration.  Mapping addresses are always
//! recomputed from hand, gesture, and mode on load; an `address` key in the
//! file is ignored.

use std::path::{Path, PathBuf};
use std::time::Duration;

use aether_core::{Mapping, MappingStore, StreamingConfig, WireFormat};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::application::detection_loop::PipelineConfig;
use crate::infrastructure::network::TransportConfig;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level client configuration stored on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ClientConfig {
    #[serde(default)]
    pub client: ClientSection,
    #[serde(default)]
    pub transport: TransportSection,
    #[serde(default)]
    pub streaming: StreamingSection,
    #[serde(default)]
    pub pipeline: PipelineSection,
    #[serde(default)]
    pub mappings: Vec<Mapping>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClientSection {
    /// `tracing` log level used when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Connection to the bridge.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransportSection {
    #[serde(default = "default_url")]
    pub url: String,
    #[serde(default = "default_reconnect_interval_ms")]
    pub reconnect_interval_ms: u64,
    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,
    /// `"binary"` (compact frames) or `"json"` (legacy text frames).
    #[serde(default)]
    pub wire_format: WireFormat,
    #[serde(default = "default_send_queue")]
    pub send_queue: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StreamingSection {
    #[serde(default = "default_value_threshold")]
    pub value_threshold: f32,
    #[serde(default = "default_trigger_debounce_ms")]
    pub trigger_debounce_ms: u64,
    /// Exponential smoothing factor for fader/knob values; off when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub smoothing: Option<f32>,
    #[serde(default = "default_stale_after_ms")]
    pub stale_after_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PipelineSection {
    /// Time between frames (16 ms is roughly 60 Hz).
    #[serde(default = "default_frame_interval_ms")]
    pub frame_interval_ms: u64,
    #[serde(default)]
    pub min_gesture_score: f32,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_log_level() -> String {
    "info".to_string()
}
fn default_url() -> String {
    TransportConfig::default().url
}
fn default_reconnect_interval_ms() -> u64 {
    3000
}
fn default_max_reconnect_attempts() -> u32 {
    5
}
fn default_send_queue() -> usize {
    64
}
fn default_value_threshold() -> f32 {
    0.001
}
fn default_trigger_debounce_ms() -> u64 {
    400
}
fn default_stale_after_ms() -> u64 {
    30_000
}
fn default_frame_interval_ms() -> u64 {
    16
}

impl Default for ClientSection {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl Default for TransportSection {
    fn default() -> Self {
        Self {
            url: default_url(),
            reconnect_interval_ms: default_reconnect_interval_ms(),
            max_reconnect_attempts: default_max_reconnect_attempts(),
            wire_format: WireFormat::default(),
            send_queue: default_send_queue(),
        }
    }
}

impl Default for StreamingSection {
    fn default() -> Self {
        Self {
            value_threshold: default_value_threshold(),
            trigger_debounce_ms: default_trigger_debounce_ms(),
            smoothing: None,
            stale_after_ms: default_stale_after_ms(),
        }
    }
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            frame_interval_ms: default_frame_interval_ms(),
            min_gesture_score: 0.0,
        }
    }
}

// ── Conversions into runtime settings ─────────────────────────────────────────

impl ClientConfig {
    pub fn transport_config(&self) -> TransportConfig {
        let t = &self.transport;
        TransportConfig {
            url: t.url.clone(),
            reconnect_interval: Duration::from_millis(t.reconnect_interval_ms),
            max_reconnect_attempts: t.max_reconnect_attempts,
            wire_format: t.wire_format,
            send_queue: t.send_queue,
        }
    }

    pub fn streaming_config(&self) -> StreamingConfig {
        let s = &self.streaming;
        StreamingConfig {
            value_threshold: s.value_threshold,
            trigger_debounce: Duration::from_millis(s.trigger_debounce_ms),
            smoothing: s.smoothing,
            stale_after: Duration::from_millis(s.stale_after_ms),
        }
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            min_gesture_score: self.pipeline.min_gesture_score,
            streaming: self.streaming_config(),
        }
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.pipeline.frame_interval_ms)
    }

    /// A mapping store seeded with the configured mappings.
    pub fn mapping_store(&self) -> MappingStore {
        MappingStore::from_mappings(self.mappings.clone())
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Determines the platform-appropriate directory for the config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] when the platform config base
/// directory cannot be determined from the environment.
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    platform_config_dir().ok_or(ConfigError::NoPlatformConfigDir)
}

/// Resolves the full path to the config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] if the base directory cannot be
/// determined.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("config.toml"))
}

/// Loads the config from the platform location.
///
/// # Errors
///
/// See [`load_config_from`].
pub fn load_config() -> Result<ClientConfig, ConfigError> {
    load_config_from(&config_file_path()?)
}

/// Loads the config from `path`, returning `ClientConfig::default()` if the
/// file does not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config_from(path: &Path) -> Result<ClientConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("no config at {}; using defaults", path.display());
            Ok(ClientConfig::default())
        }
        Err(source) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Writes `config` to `path`, creating parent directories as needed.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_config_to(path: &Path, config: &ClientConfig) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Replaces the mapping list stored at `path`, keeping every other setting.
///
/// # Errors
///
/// Same as [`load_config_from`] and [`save_config_to`].
pub fn save_mappings_to(path: &Path, mappings: &[Mapping]) -> Result<(), ConfigError> {
    let mut config = load_config_from(path)?;
    config.mappings = mappings.to_vec();
    save_config_to(path, &config)
}

/// Resolves the platform config base directory including the `Aether` subdirectory.
fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("Aether"))
    }

    #[cfg(target_os = "linux")]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("aether"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME")
            .map(|h| PathBuf::from(h).join("Library").join("Application Support").join("Aether"))
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
