//! Bootstrap configuration for waveloop
//!
//! Configuration comes from a single TOML file. Every field has a built-in
//! default, so a missing or partial file still yields a complete config.
//!
//! # Config File Resolution Priority
//!
//! 1. Command-line argument (`--config`)
//! 2. Environment variable (`WAVELOOP_CONFIG`)
//! 3. Platform config directory (`<config_dir>/waveloop/config.toml`)
//! 4. Built-in defaults (no file)
//!
//! Individual values can then be overridden by command-line flags in the
//! binary; see `waveloop-player/src/main.rs`.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "WAVELOOP_CONFIG";

/// Complete bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Deserialize, Default)]
pub struct TomlConfig {
    /// Audio file to load (may instead be given on the command line)
    #[serde(default)]
    pub audio_file: Option<PathBuf>,

    /// Timeline geometry
    #[serde(default)]
    pub timeline: TimelineConfig,

    /// Initial segment
    #[serde(default)]
    pub segment: SegmentConfig,

    /// Playback and output settings
    #[serde(default)]
    pub playback: PlaybackConfig,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Visible timeline geometry
#[derive(Debug, Clone, Deserialize)]
pub struct TimelineConfig {
    /// Visible width in pixels; the whole buffer spans this width
    #[serde(default = "default_width")]
    pub width: u32,

    /// Track height in pixels
    #[serde(default = "default_height")]
    pub height: u32,
}

/// Initial segment geometry in seconds
#[derive(Debug, Clone, Deserialize)]
pub struct SegmentConfig {
    #[serde(default = "default_segment_start")]
    pub start: f64,

    #[serde(default = "default_segment_duration")]
    pub duration: f64,
}

/// Playback settings
#[derive(Debug, Clone, Deserialize)]
pub struct PlaybackConfig {
    /// Loop playback between the loop boundaries
    #[serde(default = "default_true", rename = "loop")]
    pub looping: bool,

    /// Clamp loop boundaries to `[0, buffer duration]`
    ///
    /// When false, out-of-range segments are passed to the transport
    /// unchanged, which plays trailing silence past the buffer end.
    #[serde(default = "default_true")]
    pub clamp_to_buffer: bool,

    /// Cursor sampling interval in milliseconds (one display frame)
    #[serde(default = "default_frame_interval_ms")]
    pub frame_interval_ms: u64,

    /// Output device name (None = default device)
    #[serde(default)]
    pub device: Option<String>,

    /// Capacity of the output ring buffer in frames
    #[serde(default = "default_ring_buffer_frames")]
    pub ring_buffer_frames: usize,

    /// Run without an audio device (transport driven by the wall clock)
    #[serde(default)]
    pub headless: bool,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_width() -> u32 {
    1000
}

fn default_height() -> u32 {
    200
}

fn default_segment_start() -> f64 {
    1.0
}

fn default_segment_duration() -> f64 {
    2.0
}

fn default_true() -> bool {
    true
}

fn default_frame_interval_ms() -> u64 {
    16 // ~60 frames per second
}

fn default_ring_buffer_frames() -> usize {
    4096
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
        }
    }
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            start: default_segment_start(),
            duration: default_segment_duration(),
        }
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            looping: true,
            clamp_to_buffer: true,
            frame_interval_ms: default_frame_interval_ms(),
            device: None,
            ring_buffer_frames: default_ring_buffer_frames(),
            headless: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl TomlConfig {
    /// Parse configuration from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TomlConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file
    ///
    /// Unlike [`TomlConfig::load`], a missing file is an error here.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        let config = Self::from_toml_str(&content)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Resolve and load configuration
    ///
    /// An explicitly requested file (CLI or environment) must exist and parse.
    /// The platform default file is optional: if it does not exist, a warning
    /// is logged and built-in defaults are used.
    pub fn load(cli_path: Option<&Path>) -> Result<Self> {
        match resolve_config_path(cli_path) {
            ConfigSource::Explicit(path) => Self::from_file(&path),
            ConfigSource::PlatformDefault(path) if path.exists() => Self::from_file(&path),
            ConfigSource::PlatformDefault(path) => {
                warn!(
                    "No config file at {}, using built-in defaults",
                    path.display()
                );
                Ok(Self::default())
            }
            ConfigSource::None => {
                warn!("Could not determine config directory, using built-in defaults");
                Ok(Self::default())
            }
        }
    }

    /// Check value ranges that serde cannot express
    pub fn validate(&self) -> Result<()> {
        if self.timeline.width == 0 {
            return Err(Error::Config("timeline.width must be > 0".to_string()));
        }
        if !(self.segment.duration > 0.0) {
            return Err(Error::Config(format!(
                "segment.duration must be > 0 (got {})",
                self.segment.duration
            )));
        }
        if !(self.segment.start >= 0.0) {
            return Err(Error::Config(format!(
                "segment.start must be >= 0 (got {})",
                self.segment.start
            )));
        }
        if self.playback.frame_interval_ms == 0 {
            return Err(Error::Config(
                "playback.frame_interval_ms must be > 0".to_string(),
            ));
        }
        if self.playback.ring_buffer_frames == 0 {
            return Err(Error::Config(
                "playback.ring_buffer_frames must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Where the config file came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Given on the command line or via `WAVELOOP_CONFIG`
    Explicit(PathBuf),
    /// Platform config directory location (may not exist)
    PlatformDefault(PathBuf),
    /// No candidate path could be determined
    None,
}

/// Resolve the config file location following the documented priority order
pub fn resolve_config_path(cli_path: Option<&Path>) -> ConfigSource {
    // Priority 1: Command-line argument
    if let Some(path) = cli_path {
        return ConfigSource::Explicit(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.is_empty() {
            return ConfigSource::Explicit(PathBuf::from(path));
        }
    }

    // Priority 3: Platform config directory
    match default_config_path() {
        Some(path) => ConfigSource::PlatformDefault(path),
        None => ConfigSource::None,
    }
}

/// Platform default config file path (`<config_dir>/waveloop/config.toml`)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("waveloop").join("config.toml"))
}
