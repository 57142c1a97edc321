//! Core audio data types
//!
//! Defines the decoded audio buffer and the stereo frame passed through the
//! output pipeline.

use std::sync::Arc;

/// Single stereo frame (one sample per channel)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AudioFrame {
    pub left: f32,
    pub right: f32,
}

impl AudioFrame {
    /// Create frame from left/right samples
    pub fn new(left: f32, right: f32) -> Self {
        Self { left, right }
    }

    /// Silent frame
    pub fn zero() -> Self {
        Self {
            left: 0.0,
            right: 0.0,
        }
    }
}

/// Fully decoded audio held in RAM
///
/// **Format:**
/// - Samples are f32 (floating point -1.0 to 1.0)
/// - Stereo interleaved: [L, R, L, R, ...]
///
/// Buffers are immutable once loaded and shared as `Arc<AudioBuffer>`.
#[derive(Debug, Clone)]
pub struct AudioBuffer {
    /// PCM audio samples (interleaved stereo)
    samples: Vec<f32>,

    /// Sample rate in Hz
    sample_rate: u32,

    /// Number of stereo frames (samples.len() / 2)
    frame_count: usize,
}

/// Shared, immutable audio buffer
pub type SharedBuffer = Arc<AudioBuffer>;

impl AudioBuffer {
    /// Create a buffer from interleaved stereo samples
    ///
    /// A trailing half frame (odd sample count) is dropped.
    pub fn new(mut samples: Vec<f32>, sample_rate: u32) -> Self {
        if samples.len() % 2 != 0 {
            samples.pop();
        }
        let frame_count = samples.len() / 2;
        Self {
            samples,
            sample_rate,
            frame_count,
        }
    }

    /// Sample rate in Hz
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of stereo frames
    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    /// Total duration in seconds
    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frame_count as f64 / self.sample_rate as f64
    }

    /// Interleaved samples
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Frame at `index`, or None past the end of the buffer
    pub fn frame(&self, index: usize) -> Option<AudioFrame> {
        let i = index.checked_mul(2)?;
        match (self.samples.get(i), self.samples.get(i + 1)) {
            (Some(&left), Some(&right)) => Some(AudioFrame { left, right }),
            _ => None,
        }
    }

    /// Wrap into a shared handle
    pub fn into_shared(self) -> SharedBuffer {
        Arc::new(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration() {
        let buffer = AudioBuffer::new(vec![0.0; 44100 * 2], 44100);
        assert_eq!(buffer.frame_count(), 44100);
        assert_eq!(buffer.duration(), 1.0);
    }

    #[test]
    fn test_odd_sample_count_dropped() {
        let buffer = AudioBuffer::new(vec![0.1, 0.2, 0.3], 44100);
        assert_eq!(buffer.frame_count(), 1);
        assert_eq!(buffer.samples().len(), 2);
    }

    #[test]
    fn test_frame_access() {
        let buffer = AudioBuffer::new(vec![0.1, 0.2, 0.3, 0.4], 8000);
        assert_eq!(buffer.frame(0), Some(AudioFrame::new(0.1, 0.2)));
        assert_eq!(buffer.frame(1), Some(AudioFrame::new(0.3, 0.4)));
        assert_eq!(buffer.frame(2), None);
        assert_eq!(buffer.frame(usize::MAX), None);
    }

    #[test]
    fn test_zero_rate_duration() {
        let buffer = AudioBuffer::new(vec![0.0; 4], 0);
        assert_eq!(buffer.duration(), 0.0);
    }
}
