//! Error types for waveloop-player
//!
//! Defines module-specific error types using thiserror for clear error propagation.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for waveloop-player
#[derive(Error, Debug)]
pub enum Error {
    /// Errors from the shared crate (configuration, I/O)
    #[error(transparent)]
    Common(#[from] waveloop_common::Error),

    /// Audio file could not be found or opened
    #[error("Audio file not found: {0}")]
    FileNotFound(PathBuf),

    /// Audio decoding errors
    #[error("Audio decode error: {0}")]
    Decode(String),

    /// Resampling errors
    #[error("Resample error: {0}")]
    Resample(String),

    /// Audio output device errors
    #[error("Audio output error: {0}")]
    AudioOutput(String),

    /// Segment geometry that cannot become a loop window
    #[error("Invalid segment: start={start}, duration={duration}")]
    InvalidSegment { start: f64, duration: f64 },

    /// Loop boundaries with `end <= start`
    #[error("Invalid loop boundaries: start={start}, end={end}")]
    InvalidLoopBoundaries { start: f64, end: f64 },

    /// Playback/transport errors
    #[error("Playback error: {0}")]
    Playback(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Background task failed to complete
    #[error("Task error: {0}")]
    Task(String),
}

/// Convenience Result type using waveloop-player Error
pub type Result<T> = std::result::Result<T, Error>;
