//! # Waveloop Common Library
//!
//! Shared code for the waveloop workspace including:
//! - Error type shared by all crates
//! - TOML bootstrap configuration and its resolution order
//! - Event types (LoopEvent enum) and the EventBus
//! - Time/frame conversion helpers

pub mod config;
pub mod error;
pub mod events;
pub mod time;

pub use error::{Error, Result};
pub use events::{EventBus, LoopEvent};
