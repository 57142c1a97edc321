//! Time/frame conversion utilities
//!
//! Positions are exchanged in seconds (f64) between components and kept as
//! frame counts (u64) inside the transport clock.

/// Convert seconds to a frame index at `sample_rate`
///
/// Negative and non-finite inputs map to frame 0. Rounds to the nearest frame.
pub fn seconds_to_frames(seconds: f64, sample_rate: u32) -> u64 {
    if !seconds.is_finite() || seconds <= 0.0 {
        return 0;
    }
    (seconds * sample_rate as f64).round() as u64
}

/// Convert a frame index at `sample_rate` to seconds
pub fn frames_to_seconds(frames: u64, sample_rate: u32) -> f64 {
    if sample_rate == 0 {
        return 0.0;
    }
    frames as f64 / sample_rate as f64
}

/// Format seconds as `m:ss.mmm` for log output
pub fn format_seconds(seconds: f64) -> String {
    let total_ms = (seconds.max(0.0) * 1000.0).round() as u64;
    let minutes = total_ms / 60_000;
    let secs = (total_ms % 60_000) / 1000;
    let millis = total_ms % 1000;
    format!("{}:{:02}.{:03}", minutes, secs, millis)
}
