//! Segment editor
//!
//! Owns the editable [`Segment`] and applies drag-style edits expressed in
//! pixels. After every mutation each registered [`SegmentObserver`] is
//! notified synchronously, in registration order, before the edit call
//! returns. The editor does not validate geometry: a drag that collapses the
//! duration is passed through and left to the observers.

use crate::playback::segment::Segment;
use crate::timeline::TimeContext;
use tracing::debug;
use waveloop_common::events::{EventBus, LoopEvent};

/// Receives "edited" notifications from the [`SegmentEditor`]
pub trait SegmentObserver: Send {
    /// Called after every change to the segment
    fn segment_edited(&mut self, segment: &Segment);
}

/// Declarative mapping between segment fields and shape geometry
///
/// `x <-> start`, `width <-> duration`, scaled by the time context.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentShape {
    pub color: String,
}

impl SegmentShape {
    pub fn new(color: impl Into<String>) -> Self {
        Self {
            color: color.into(),
        }
    }

    pub fn x(&self, segment: &Segment, ctx: &TimeContext) -> f64 {
        ctx.time_to_pixel(segment.start)
    }

    pub fn width(&self, segment: &Segment, ctx: &TimeContext) -> f64 {
        ctx.duration_to_pixels(segment.duration)
    }

    pub fn start_from_x(&self, x: f64, ctx: &TimeContext) -> f64 {
        ctx.pixel_to_time(x)
    }

    pub fn duration_from_width(&self, width: f64, ctx: &TimeContext) -> f64 {
        ctx.pixels_to_duration(width)
    }
}

impl Default for SegmentShape {
    fn default() -> Self {
        Self::new("steelblue")
    }
}

/// Editable segment plus its observers
pub struct SegmentEditor {
    segment: Segment,
    context: TimeContext,
    shape: SegmentShape,
    observers: Vec<Box<dyn SegmentObserver>>,
    event_bus: Option<EventBus>,
}

impl SegmentEditor {
    pub fn new(segment: Segment, context: TimeContext) -> Self {
        Self {
            segment,
            context,
            shape: SegmentShape::default(),
            observers: Vec::new(),
            event_bus: None,
        }
    }

    pub fn with_shape(mut self, shape: SegmentShape) -> Self {
        self.shape = shape;
        self
    }

    /// Publish `SegmentEdited` on `bus` after each edit
    pub fn with_event_bus(mut self, bus: EventBus) -> Self {
        self.event_bus = Some(bus);
        self
    }

    /// Register an observer; notified after every later edit
    pub fn subscribe(&mut self, observer: Box<dyn SegmentObserver>) {
        self.observers.push(observer);
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    pub fn segment(&self) -> Segment {
        self.segment
    }

    pub fn context(&self) -> &TimeContext {
        &self.context
    }

    pub fn shape(&self) -> &SegmentShape {
        &self.shape
    }

    /// Shape geometry `(x, width)` in pixels
    pub fn geometry(&self) -> (f64, f64) {
        (
            self.shape.x(&self.segment, &self.context),
            self.shape.width(&self.segment, &self.context),
        )
    }

    /// Replace the segment
    pub fn set_segment(&mut self, segment: Segment) -> Segment {
        self.segment = segment;
        self.notify()
    }

    pub fn set_start(&mut self, start: f64) -> Segment {
        self.segment.start = start;
        self.notify()
    }

    pub fn set_duration(&mut self, duration: f64) -> Segment {
        self.segment.duration = duration;
        self.notify()
    }

    /// Drag the whole shape horizontally
    pub fn move_by_pixels(&mut self, dx: f64) -> Segment {
        let (x, _) = self.geometry();
        self.segment.start = self.shape.start_from_x(x + dx, &self.context);
        self.notify()
    }

    /// Drag the right handle: width changes, start fixed
    pub fn resize_end_by_pixels(&mut self, dw: f64) -> Segment {
        let (_, width) = self.geometry();
        self.segment.duration = self.shape.duration_from_width(width + dw, &self.context);
        self.notify()
    }

    /// Drag the left handle: start moves, end fixed
    pub fn resize_start_by_pixels(&mut self, dx: f64) -> Segment {
        let (x, width) = self.geometry();
        self.segment.start = self.shape.start_from_x(x + dx, &self.context);
        self.segment.duration = self.shape.duration_from_width(width - dx, &self.context);
        self.notify()
    }

    fn notify(&mut self) -> Segment {
        let segment = self.segment;
        debug!("Edited {}", segment);
        for observer in self.observers.iter_mut() {
            observer.segment_edited(&segment);
        }
        if let Some(bus) = &self.event_bus {
            bus.emit_lossy(LoopEvent::SegmentEdited {
                start: segment.start,
                duration: segment.duration,
                timestamp: chrono::Utc::now(),
            });
        }
        segment
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    struct Recorder {
        id: usize,
        log: Arc<Mutex<Vec<(usize, Segment)>>>,
    }

    impl SegmentObserver for Recorder {
        fn segment_edited(&mut self, segment: &Segment) {
            self.log.lock().unwrap().push((self.id, *segment));
        }
    }

    /// 100 px per second
    fn editor() -> SegmentEditor {
        SegmentEditor::new(Segment::new(1.0, 2.0), TimeContext::new(1000, 10.0).unwrap())
    }

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{} != {}", a, b);
    }

    #[test]
    fn test_geometry() {
        let editor = editor();
        assert_eq!(editor.geometry(), (100.0, 200.0));
        assert_eq!(editor.shape().color, "steelblue");
    }

    #[test]
    fn test_move_keeps_duration() {
        let mut editor = editor();
        let segment = editor.move_by_pixels(50.0);
        assert_close(segment.start, 1.5);
        assert_close(segment.duration, 2.0);
    }

    #[test]
    fn test_resize_end_keeps_start() {
        let mut editor = editor();
        let segment = editor.resize_end_by_pixels(-50.0);
        assert_close(segment.start, 1.0);
        assert_close(segment.duration, 1.5);
    }

    #[test]
    fn test_resize_start_keeps_end() {
        let mut editor = editor();
        let segment = editor.resize_start_by_pixels(50.0);
        assert_close(segment.start, 1.5);
        assert_close(segment.end(), 3.0);
    }

    #[test]
    fn test_collapse_passed_through() {
        let mut editor = editor();
        let segment = editor.resize_end_by_pixels(-250.0);
        assert_close(segment.duration, -0.5);
    }

    #[test]
    fn test_observers_notified_in_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut editor = editor();
        editor.subscribe(Box::new(Recorder { id: 1, log: Arc::clone(&log) }));
        editor.subscribe(Box::new(Recorder { id: 2, log: Arc::clone(&log) }));

        editor.set_start(2.0);
        editor.set_duration(1.5);

        let log = log.lock().unwrap();
        assert_eq!(log.len(), 4);
        assert_eq!(log[0], (1, Segment::new(2.0, 2.0)));
        assert_eq!(log[1], (2, Segment::new(2.0, 2.0)));
        assert_eq!(log[3], (2, Segment::new(2.0, 1.5)));
    }

    #[test]
    fn test_edit_event_published() {
        let bus = EventBus::new(4);
        let mut rx = bus.subscribe();
        let mut editor = editor().with_event_bus(bus);
        editor.set_segment(Segment::new(0.5, 0.25));
        match rx.try_recv().unwrap() {
            LoopEvent::SegmentEdited { start, duration, .. } => {
                assert_eq!(start, 0.5);
                assert_eq!(duration, 0.25);
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
