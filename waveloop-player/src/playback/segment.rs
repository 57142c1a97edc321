//! Segment and loop boundary types
//!
//! A [`Segment`] is the user-editable region `[start, start + duration)`.
//! [`LoopBoundaries`] is the window the transport repeats. The mapping
//! between them is the pure function [`Segment::loop_boundaries`].

use crate::error::{Error, Result};

/// Contiguous time region of interest, in seconds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub start: f64,
    pub duration: f64,
}

impl Segment {
    pub fn new(start: f64, duration: f64) -> Self {
        Self { start, duration }
    }

    /// End time (`start + duration`)
    pub fn end(&self) -> f64 {
        self.start + self.duration
    }

    /// True if the segment can become a loop window
    ///
    /// Requires finite values and `duration > 0`.
    pub fn is_valid(&self) -> bool {
        self.start.is_finite() && self.duration.is_finite() && self.duration > 0.0
    }

    /// Map segment geometry to loop boundaries: `[start, start + duration]`
    ///
    /// # Errors
    /// `Error::InvalidSegment` if [`Segment::is_valid`] is false.
    pub fn loop_boundaries(&self) -> Result<LoopBoundaries> {
        if !self.is_valid() {
            return Err(Error::InvalidSegment {
                start: self.start,
                duration: self.duration,
            });
        }
        // Huge starts can swallow the duration when added
        LoopBoundaries::new(self.start, self.end()).map_err(|_| Error::InvalidSegment {
            start: self.start,
            duration: self.duration,
        })
    }
}

impl std::fmt::Display for Segment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "segment [{:.3}s +{:.3}s]", self.start, self.duration)
    }
}

/// Active loop window of the transport, in seconds
///
/// Invariant: `end > start`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoopBoundaries {
    start: f64,
    end: f64,
}

impl LoopBoundaries {
    /// Create boundaries, enforcing `end > start`
    pub fn new(start: f64, end: f64) -> Result<Self> {
        if !(start.is_finite() && end.is_finite() && end > start) {
            return Err(Error::InvalidLoopBoundaries { start, end });
        }
        Ok(Self { start, end })
    }

    /// Loop over a whole buffer: `[0, duration)`
    pub fn full(duration: f64) -> Result<Self> {
        Self::new(0.0, duration)
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn end(&self) -> f64 {
        self.end
    }

    /// Loop length in seconds (always > 0)
    pub fn length(&self) -> f64 {
        self.end - self.start
    }

    /// True if `t` lies in `[start, end)`
    pub fn contains(&self, t: f64) -> bool {
        t >= self.start && t < self.end
    }
}

impl std::fmt::Display for LoopBoundaries {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "loop [{:.3}s, {:.3}s)", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_maps_to_boundaries() {
        let boundaries = Segment::new(1.0, 2.0).loop_boundaries().unwrap();
        assert_eq!(boundaries.start(), 1.0);
        assert_eq!(boundaries.end(), 3.0);
        assert_eq!(boundaries.length(), 2.0);
    }

    #[test]
    fn test_non_positive_duration_is_invalid() {
        assert!(!Segment::new(2.0, 0.0).is_valid());
        assert!(!Segment::new(2.0, -0.5).is_valid());
        assert!(matches!(
            Segment::new(2.0, -0.5).loop_boundaries(),
            Err(Error::InvalidSegment { .. })
        ));
    }

    #[test]
    fn test_duration_lost_to_precision_is_rejected() {
        let segment = Segment::new(1e16, 1.0);
        assert!(segment.is_valid());
        assert!(matches!(
            segment.loop_boundaries(),
            Err(Error::InvalidSegment { .. })
        ));
    }

    #[test]
    fn test_nan_is_invalid() {
        assert!(!Segment::new(f64::NAN, 1.0).is_valid());
        assert!(!Segment::new(0.0, f64::NAN).is_valid());
        assert!(!Segment::new(0.0, f64::INFINITY).is_valid());
    }

    #[test]
    fn test_boundaries_require_end_after_start() {
        assert!(LoopBoundaries::new(1.0, 1.0).is_err());
        assert!(LoopBoundaries::new(2.0, 1.0).is_err());
        assert!(LoopBoundaries::new(1.0, 1.5).is_ok());
    }

    #[test]
    fn test_contains_is_half_open() {
        let b = LoopBoundaries::new(1.0, 3.0).unwrap();
        assert!(b.contains(1.0));
        assert!(b.contains(2.999));
        assert!(!b.contains(3.0));
        assert!(!b.contains(0.5));
    }

    #[test]
    fn test_full() {
        let b = LoopBoundaries::full(4.5).unwrap();
        assert_eq!(b.start(), 0.0);
        assert_eq!(b.end(), 4.5);
        assert!(LoopBoundaries::full(0.0).is_err());
    }
}
