//! Event types for the waveloop event system
//!
//! Provides the shared event definitions and the EventBus that carries them
//! between the editor, LoopSync, the transport, and any observers.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Transport play state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaybackState {
    Stopped,
    Playing,
}

/// Waveloop event types
///
/// Events are broadcast via EventBus and can be serialized as JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum LoopEvent {
    /// Segment geometry changed through the editor
    ///
    /// Emitted on every incremental edit, including edits that LoopSync
    /// later rejects.
    SegmentEdited {
        /// Segment start in seconds
        start: f64,
        /// Segment duration in seconds
        duration: f64,
        /// When the edit happened
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Loop boundaries were written to the transport
    LoopBoundariesChanged {
        /// Loop start in seconds
        loop_start: f64,
        /// Loop end in seconds
        loop_end: f64,
        /// True if the boundaries were clamped to the buffer
        clamped: bool,
        /// When the boundaries changed
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// An edit was ignored and the previous loop boundaries kept
    SegmentEditRejected {
        /// Rejected segment start in seconds
        start: f64,
        /// Rejected segment duration in seconds
        duration: f64,
        /// Human-readable rejection reason
        reason: String,
        /// When the edit was rejected
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Transport state changed (Stopped ↔ Playing)
    PlaybackStateChanged {
        /// State before change
        old_state: PlaybackState,
        /// State after change
        new_state: PlaybackState,
        /// When state changed
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl LoopEvent {
    /// Short event name, matching the serialized `type` tag
    pub fn event_type(&self) -> &'static str {
        match self {
            LoopEvent::SegmentEdited { .. } => "SegmentEdited",
            LoopEvent::LoopBoundariesChanged { .. } => "LoopBoundariesChanged",
            LoopEvent::SegmentEditRejected { .. } => "SegmentEditRejected",
            LoopEvent::PlaybackStateChanged { .. } => "PlaybackStateChanged",
        }
    }
}

/// Central event distribution bus
///
/// Thin wrapper over a `tokio::sync::broadcast` channel. Cloning the bus
/// clones the sender, so every clone publishes to the same subscribers.
///
/// # Examples
///
/// ```
/// use waveloop_common::events::{EventBus, LoopEvent};
///
/// let bus = EventBus::new(16);
/// let mut rx = bus.subscribe();
///
/// bus.emit_lossy(LoopEvent::SegmentEdited {
///     start: 1.0,
///     duration: 2.0,
///     timestamp: chrono::Utc::now(),
/// });
///
/// let event = rx.try_recv().unwrap();
/// assert_eq!(event.event_type(), "SegmentEdited");
/// ```
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<LoopEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// Slow subscribers lose the oldest events once `capacity` is exceeded.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<LoopEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: LoopEvent,
    ) -> std::result::Result<usize, broadcast::error::SendError<LoopEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: LoopEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
