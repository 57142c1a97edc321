//! Playback: transport, loop synchronization, segment editing, and the
//! session that ties them together

pub mod editor;
pub mod engine;
pub mod loop_sync;
pub mod position;
pub mod ring_buffer;
pub mod segment;
pub mod transport;

pub use editor::{SegmentEditor, SegmentObserver, SegmentShape};
pub use engine::{DriverKind, LoopSession, SessionSettings, SessionStatus};
pub use loop_sync::{EditOutcome, LoopSync, LoopSyncObserver, LoopSyncSettings};
pub use position::{start_position_sampling, SamplingHandle};
pub use segment::{LoopBoundaries, Segment};
pub use transport::{LoopTransport, PlaybackTransport, TransportHandle};
