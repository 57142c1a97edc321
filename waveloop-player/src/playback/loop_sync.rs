//! Segment → loop boundary synchronization
//!
//! LoopSync keeps the transport's loop window consistent with the
//! user-editable [`Segment`]. The relationship is one-way: segment edits are
//! pushed into the transport, the transport's boundaries are never read back.
//!
//! Every incremental edit is applied (no debouncing). An edit whose duration
//! is zero or negative is skipped and the last valid boundaries stay in
//! effect. With `clamp_to_buffer` enabled, boundaries are clamped to
//! `[0, buffer duration]`; an edit that clamps to nothing is skipped too.

use crate::error::{Error, Result};
use crate::playback::editor::SegmentObserver;
use crate::playback::segment::{LoopBoundaries, Segment};
use crate::playback::transport::{LoopTransport, TransportHandle};
use tracing::{debug, info, warn};
use waveloop_common::events::{EventBus, LoopEvent};

/// LoopSync policy
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoopSyncSettings {
    /// Duration of the loaded buffer in seconds
    pub buffer_duration: f64,
    /// Clamp loop boundaries to `[0, buffer_duration]`
    pub clamp_to_buffer: bool,
}

impl LoopSyncSettings {
    pub fn new(buffer_duration: f64) -> Self {
        Self {
            buffer_duration,
            clamp_to_buffer: true,
        }
    }

    pub fn with_clamp_to_buffer(mut self, clamp: bool) -> Self {
        self.clamp_to_buffer = clamp;
        self
    }
}

/// Result of applying one segment edit
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EditOutcome {
    /// Boundaries written exactly as `[start, start + duration]`
    Applied(LoopBoundaries),
    /// Boundaries written after clamping to the buffer
    Clamped(LoopBoundaries),
    /// Edit skipped; previous boundaries remain in effect
    Rejected,
}

impl EditOutcome {
    /// Boundaries written to the transport, if any
    pub fn boundaries(&self) -> Option<LoopBoundaries> {
        match self {
            EditOutcome::Applied(b) | EditOutcome::Clamped(b) => Some(*b),
            EditOutcome::Rejected => None,
        }
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, EditOutcome::Rejected)
    }
}

/// Why an edit could not become a loop window
#[derive(Debug, Clone, Copy, PartialEq)]
enum Rejection {
    NonPositiveDuration,
    OutsideBuffer,
}

impl Rejection {
    fn reason(&self) -> &'static str {
        match self {
            Rejection::NonPositiveDuration => "segment duration must be positive",
            Rejection::OutsideBuffer => "segment lies outside the buffer",
        }
    }
}

/// Bridges segment edits to transport loop boundaries
#[derive(Debug)]
pub struct LoopSync {
    settings: LoopSyncSettings,
    last_applied: Option<LoopBoundaries>,
    edits_applied: u64,
    edits_rejected: u64,
    event_bus: Option<EventBus>,
}

impl LoopSync {
    pub fn new(settings: LoopSyncSettings) -> Self {
        Self {
            settings,
            last_applied: None,
            edits_applied: 0,
            edits_rejected: 0,
            event_bus: None,
        }
    }

    /// Publish boundary changes and rejections on `bus`
    pub fn with_event_bus(mut self, bus: EventBus) -> Self {
        self.event_bus = Some(bus);
        self
    }

    pub fn settings(&self) -> &LoopSyncSettings {
        &self.settings
    }

    /// Boundaries most recently written to the transport
    pub fn last_applied(&self) -> Option<LoopBoundaries> {
        self.last_applied
    }

    /// (applied, rejected) edit counts
    pub fn edit_counts(&self) -> (u64, u64) {
        (self.edits_applied, self.edits_rejected)
    }

    /// Set the transport's loop window from the initial segment
    ///
    /// Overwrites whatever boundaries the transport had.
    ///
    /// # Errors
    /// `Error::InvalidSegment` if the segment's duration is not positive (or
    /// it clamps to nothing); the transport is left untouched.
    pub fn initialize<T>(&mut self, segment: &Segment, transport: &mut T) -> Result<LoopBoundaries>
    where
        T: LoopTransport + ?Sized,
    {
        let (boundaries, _clamped) =
            self.resolve(segment)
                .map_err(|_| Error::InvalidSegment {
                    start: segment.start,
                    duration: segment.duration,
                })?;

        transport.set_loop_boundaries(boundaries);
        self.last_applied = Some(boundaries);
        info!("LoopSync initialized: {} -> {}", segment, boundaries);
        self.publish_boundaries(boundaries, false);
        Ok(boundaries)
    }

    /// Propagate one segment edit to the transport
    pub fn on_segment_edited<T>(&mut self, segment: &Segment, transport: &mut T) -> EditOutcome
    where
        T: LoopTransport + ?Sized,
    {
        match self.resolve(segment) {
            Ok((boundaries, clamped)) => {
                transport.set_loop_boundaries(boundaries);
                self.last_applied = Some(boundaries);
                self.edits_applied += 1;
                debug!("Segment edited: {} -> {}", segment, boundaries);
                self.publish_boundaries(boundaries, clamped);
                if clamped {
                    EditOutcome::Clamped(boundaries)
                } else {
                    EditOutcome::Applied(boundaries)
                }
            }
            Err(rejection) => {
                self.edits_rejected += 1;
                debug!(
                    "Ignoring segment edit {}: {}; keeping {}",
                    segment,
                    rejection.reason(),
                    self.last_applied
                        .map(|b| b.to_string())
                        .unwrap_or_else(|| "transport boundaries".to_string())
                );
                if let Some(bus) = &self.event_bus {
                    bus.emit_lossy(LoopEvent::SegmentEditRejected {
                        start: segment.start,
                        duration: segment.duration,
                        reason: rejection.reason().to_string(),
                        timestamp: chrono::Utc::now(),
                    });
                }
                EditOutcome::Rejected
            }
        }
    }

    /// Current playback position in seconds (pure read)
    pub fn sample_position<T>(&self, transport: &T) -> f64
    where
        T: LoopTransport + ?Sized,
    {
        transport.current_position()
    }

    /// Map a segment to the boundaries that will be written
    fn resolve(&self, segment: &Segment) -> std::result::Result<(LoopBoundaries, bool), Rejection> {
        let exact = segment
            .loop_boundaries()
            .map_err(|_| Rejection::NonPositiveDuration)?;

        if !self.settings.clamp_to_buffer {
            return Ok((exact, false));
        }

        let start = exact.start().max(0.0);
        let end = exact.end().min(self.settings.buffer_duration);
        if start == exact.start() && end == exact.end() {
            return Ok((exact, false));
        }

        let clamped = LoopBoundaries::new(start, end).map_err(|_| {
            warn!(
                "{} lies entirely outside the buffer (0s - {:.3}s)",
                segment, self.settings.buffer_duration
            );
            Rejection::OutsideBuffer
        })?;
        warn!(
            "Clamped {} to buffer duration {:.3}s: {}",
            segment, self.settings.buffer_duration, clamped
        );
        Ok((clamped, true))
    }

    fn publish_boundaries(&self, boundaries: LoopBoundaries, clamped: bool) {
        if let Some(bus) = &self.event_bus {
            bus.emit_lossy(LoopEvent::LoopBoundariesChanged {
                loop_start: boundaries.start(),
                loop_end: boundaries.end(),
                clamped,
                timestamp: chrono::Utc::now(),
            });
        }
    }
}

/// LoopSync bound to the shared transport, registered on the editor
pub struct LoopSyncObserver {
    sync: LoopSync,
    transport: TransportHandle,
}

impl LoopSyncObserver {
    pub fn new(sync: LoopSync, transport: TransportHandle) -> Self {
        Self { sync, transport }
    }

    pub fn sync(&self) -> &LoopSync {
        &self.sync
    }
}

impl SegmentObserver for LoopSyncObserver {
    fn segment_edited(&mut self, segment: &Segment) {
        self.sync.on_segment_edited(segment, &mut self.transport);
    }
}
