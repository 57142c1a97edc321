//! Audio subsystem: buffer loading, resampling, and device output

pub mod decoder;
pub mod output;
pub mod resampler;
pub mod types;

pub use decoder::AudioBufferLoader;
pub use output::AudioOutput;
pub use resampler::Resampler;
pub use types::{AudioBuffer, AudioFrame, SharedBuffer};
