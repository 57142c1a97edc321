//! Timeline geometry: time ↔ pixel mapping and the playback cursor
//!
//! Pixel rendering is not done here; these types only carry the
//! coordinates a renderer would draw at.

use crate::error::{Error, Result};

/// Pixel density of the visible timeline
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeContext {
    pixels_per_second: f64,
    width: u32,
}

impl TimeContext {
    /// Fit `duration` seconds into `width` pixels
    ///
    /// # Errors
    /// `Error::Playback` if width is 0 or duration is not positive.
    pub fn new(width: u32, duration: f64) -> Result<Self> {
        if width == 0 || !(duration.is_finite() && duration > 0.0) {
            return Err(Error::Playback(format!(
                "Invalid timeline: width={} duration={}",
                width, duration
            )));
        }
        Ok(Self {
            pixels_per_second: width as f64 / duration,
            width,
        })
    }

    pub fn pixels_per_second(&self) -> f64 {
        self.pixels_per_second
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    /// Seconds visible across the full width
    pub fn visible_duration(&self) -> f64 {
        self.width as f64 / self.pixels_per_second
    }

    pub fn time_to_pixel(&self, seconds: f64) -> f64 {
        seconds * self.pixels_per_second
    }

    pub fn pixel_to_time(&self, x: f64) -> f64 {
        x / self.pixels_per_second
    }

    pub fn duration_to_pixels(&self, seconds: f64) -> f64 {
        seconds * self.pixels_per_second
    }

    pub fn pixels_to_duration(&self, pixels: f64) -> f64 {
        pixels / self.pixels_per_second
    }
}

/// Playback cursor: the last sampled position
#[derive(Debug, Clone, Copy)]
pub struct Cursor {
    context: TimeContext,
    position: f64,
}

impl Cursor {
    pub fn new(context: TimeContext) -> Self {
        Self {
            context,
            position: 0.0,
        }
    }

    /// Record a new position sample
    pub fn update(&mut self, position: f64) {
        self.position = position;
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    /// Horizontal pixel offset of the cursor
    pub fn x(&self) -> f64 {
        self.context.time_to_pixel(self.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pixels_per_second() {
        let ctx = TimeContext::new(1000, 4.0).unwrap();
        assert_eq!(ctx.pixels_per_second(), 250.0);
        assert_eq!(ctx.visible_duration(), 4.0);
    }

    #[test]
    fn test_conversions() {
        let ctx = TimeContext::new(1000, 4.0).unwrap();
        assert_eq!(ctx.time_to_pixel(1.0), 250.0);
        assert_eq!(ctx.pixel_to_time(500.0), 2.0);
        assert_eq!(ctx.duration_to_pixels(0.5), 125.0);
        assert_eq!(ctx.pixels_to_duration(-25.0), -0.1);
    }

    #[test]
    fn test_invalid_context() {
        assert!(TimeContext::new(0, 4.0).is_err());
        assert!(TimeContext::new(1000, 0.0).is_err());
        assert!(TimeContext::new(1000, f64::NAN).is_err());
    }

    #[test]
    fn test_cursor_tracks_position() {
        let mut cursor = Cursor::new(TimeContext::new(800, 8.0).unwrap());
        assert_eq!(cursor.x(), 0.0);
        cursor.update(2.5);
        assert_eq!(cursor.position(), 2.5);
        assert_eq!(cursor.x(), 250.0);
    }
}
