//! # Waveloop Player Library
//!
//! Loads an audio file, plays it in a loop, and keeps the loop window in
//! step with an editable segment.
//!
//! **Architecture:**
//! - `audio`: buffer loading (symphonia), resampling (rubato), device output (cpal)
//! - `playback::transport`: sample-accurate looping transport
//! - `playback::loop_sync`: segment edits → loop boundaries
//! - `playback::editor`: pixel-space segment edits with observers
//! - `playback::position`: cancellable per-frame cursor sampling
//! - `playback::engine`: session orchestration and audio drivers
//!
//! Data flows one way: editor → LoopSync → transport. The transport's loop
//! boundaries are never written back into the segment.

pub mod audio;
pub mod commands;
pub mod context;
pub mod error;
pub mod playback;
pub mod timeline;

pub use error::{Error, Result};
