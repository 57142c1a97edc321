//! Playback transport
//!
//! Owns the sample-accurate playback clock, the play state, and the loop
//! window. The transport is pulled by a driver (mixer thread or headless
//! clock) through [`PlaybackTransport::render`]; every rendered frame
//! advances the clock by exactly one frame.
//!
//! **Loop semantics:**
//! - When looping and the clock reaches `loop_end`, it wraps to `loop_start`
//! - New boundaries are adopted immediately: a position past the new end
//!   wraps on the next rendered frame, a position before the new start
//!   plays forward into the loop
//! - Past the end of the buffer, silence is rendered
//! - When not looping, the transport stops at the end of the buffer

use crate::audio::types::{AudioFrame, SharedBuffer};
use crate::error::{Error, Result};
use crate::playback::segment::LoopBoundaries;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};
use waveloop_common::events::{EventBus, LoopEvent, PlaybackState};
use waveloop_common::time::{frames_to_seconds, seconds_to_frames};

/// The narrow transport interface LoopSync depends on
///
/// LoopSync only pushes boundaries and reads the position; it never reads
/// the boundaries back.
pub trait LoopTransport {
    /// Replace the active loop window
    fn set_loop_boundaries(&mut self, boundaries: LoopBoundaries);

    /// Current playback position in seconds
    fn current_position(&self) -> f64;
}

/// Sample-accurate looping transport over one audio buffer
#[derive(Debug)]
pub struct PlaybackTransport {
    buffer: SharedBuffer,
    state: PlaybackState,
    looping: bool,
    boundaries: LoopBoundaries,
    loop_start_frame: u64,
    loop_end_frame: u64,
    /// Clock position in frames
    frame_position: u64,
    /// Total frames rendered while playing (never wraps)
    frames_played: u64,
    event_bus: Option<EventBus>,
}

impl PlaybackTransport {
    /// Create a stopped transport at position 0, looping disabled, with loop
    /// boundaries covering the whole buffer.
    ///
    /// # Errors
    /// `Error::Playback` if the buffer is empty.
    pub fn new(buffer: SharedBuffer) -> Result<Self> {
        let boundaries = LoopBoundaries::full(buffer.duration())
            .map_err(|_| Error::Playback("Cannot play an empty buffer".to_string()))?;
        let mut transport = Self {
            buffer,
            state: PlaybackState::Stopped,
            looping: false,
            boundaries,
            loop_start_frame: 0,
            loop_end_frame: 0,
            frame_position: 0,
            frames_played: 0,
            event_bus: None,
        };
        transport.update_loop_frames();
        Ok(transport)
    }

    /// Publish state changes on `bus`
    pub fn with_event_bus(mut self, bus: EventBus) -> Self {
        self.event_bus = Some(bus);
        self
    }

    pub fn buffer(&self) -> &SharedBuffer {
        &self.buffer
    }

    pub fn sample_rate(&self) -> u32 {
        self.buffer.sample_rate()
    }

    /// Buffer duration in seconds
    pub fn duration(&self) -> f64 {
        self.buffer.duration()
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    pub fn set_looping(&mut self, looping: bool) {
        if self.looping != looping {
            debug!("Looping {}", if looping { "enabled" } else { "disabled" });
        }
        self.looping = looping;
    }

    /// Active loop window
    pub fn loop_boundaries(&self) -> LoopBoundaries {
        self.boundaries
    }

    /// Clock position in frames
    pub fn frame_position(&self) -> u64 {
        self.frame_position
    }

    /// Total frames rendered while playing since creation
    pub fn frames_played(&self) -> u64 {
        self.frames_played
    }

    /// Start (or resume) playback
    ///
    /// A non-looping transport sitting at the end of the buffer restarts
    /// from 0.
    pub fn start(&mut self) {
        if self.is_playing() {
            return;
        }
        if !self.looping && self.frame_position >= self.buffer.frame_count() as u64 {
            self.frame_position = 0;
        }
        info!(
            "Transport started at {:.3}s",
            frames_to_seconds(self.frame_position, self.sample_rate())
        );
        self.transition(PlaybackState::Playing);
    }

    /// Stop playback and rewind to the loop start (looping) or 0
    pub fn stop(&mut self) {
        self.frame_position = if self.looping {
            self.loop_start_frame
        } else {
            0
        };
        if self.is_playing() {
            info!("Transport stopped");
            self.transition(PlaybackState::Stopped);
        }
    }

    /// Move the clock to `seconds` (clamped to >= 0)
    pub fn seek(&mut self, seconds: f64) {
        self.frame_position = seconds_to_frames(seconds, self.sample_rate());
        debug!(
            "Seek to {:.3}s",
            frames_to_seconds(self.frame_position, self.sample_rate())
        );
    }

    /// Fill `output` with the next frames and advance the clock
    ///
    /// Returns the number of frames the clock advanced (0 while stopped).
    pub fn render(&mut self, output: &mut [AudioFrame]) -> usize {
        let mut advanced = 0;
        let buffer_frames = self.buffer.frame_count() as u64;

        for slot in output.iter_mut() {
            if !self.is_playing() {
                *slot = AudioFrame::zero();
                continue;
            }

            self.wrap_if_needed();

            if !self.looping && self.frame_position >= buffer_frames {
                info!("Reached end of buffer, stopping");
                self.transition(PlaybackState::Stopped);
                *slot = AudioFrame::zero();
                continue;
            }

            *slot = self
                .buffer
                .frame(self.frame_position as usize)
                .unwrap_or_default();
            self.frame_position = self.frame_position.saturating_add(1);
            self.frames_played = self.frames_played.saturating_add(1);
            advanced += 1;
        }

        if self.is_playing() {
            self.wrap_if_needed();
        }
        advanced
    }

    /// Advance the clock by `frames` without producing audio
    pub fn advance(&mut self, frames: usize) -> usize {
        let mut scratch = vec![AudioFrame::zero(); frames];
        self.render(&mut scratch)
    }

    fn wrap_if_needed(&mut self) {
        if self.looping && self.frame_position >= self.loop_end_frame {
            self.frame_position = self.loop_start_frame;
        }
    }

    fn update_loop_frames(&mut self) {
        let rate = self.sample_rate();
        let start = seconds_to_frames(self.boundaries.start(), rate);
        let end = seconds_to_frames(self.boundaries.end(), rate);
        self.loop_start_frame = start;
        // Windows shorter than one frame still loop over one frame
        self.loop_end_frame = end.max(start.saturating_add(1));
    }

    fn transition(&mut self, new_state: PlaybackState) {
        let old_state = self.state;
        if old_state == new_state {
            return;
        }
        self.state = new_state;
        if let Some(bus) = &self.event_bus {
            bus.emit_lossy(LoopEvent::PlaybackStateChanged {
                old_state,
                new_state,
                timestamp: chrono::Utc::now(),
            });
        }
    }
}

impl LoopTransport for PlaybackTransport {
    fn set_loop_boundaries(&mut self, boundaries: LoopBoundaries) {
        self.boundaries = boundaries;
        self.update_loop_frames();
        debug!("Transport {}", boundaries);
    }

    fn current_position(&self) -> f64 {
        frames_to_seconds(self.frame_position, self.sample_rate())
    }
}

/// Shared handle to the transport
///
/// The transport is written by the edit path and the driver, and read by
/// the position sampler; all access goes through one mutex.
#[derive(Debug, Clone)]
pub struct TransportHandle {
    inner: Arc<Mutex<PlaybackTransport>>,
}

impl TransportHandle {
    pub fn new(transport: PlaybackTransport) -> Self {
        Self {
            inner: Arc::new(Mutex::new(transport)),
        }
    }

    /// Lock the transport
    ///
    /// A poisoned lock is recovered: transport state stays consistent
    /// between individual field writes.
    pub fn lock(&self) -> MutexGuard<'_, PlaybackTransport> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Run `f` with exclusive access to the transport
    pub fn with<R>(&self, f: impl FnOnce(&mut PlaybackTransport) -> R) -> R {
        let mut guard = self.lock();
        f(&mut guard)
    }
}

impl LoopTransport for TransportHandle {
    fn set_loop_boundaries(&mut self, boundaries: LoopBoundaries) {
        self.lock().set_loop_boundaries(boundaries);
    }

    fn current_position(&self) -> f64 {
        self.lock().current_position()
    }
}
