//! WAV fixture generation
//!
//! Files are written into a caller-provided directory (normally a
//! `tempfile::TempDir`) so nothing is left behind.

use hound::{SampleFormat, WavSpec, WavWriter};
use std::f32::consts::PI;
use std::path::{Path, PathBuf};

/// Sine wave, 16-bit integer PCM
pub fn generate_sine_wav(
    dir: &Path,
    name: &str,
    sample_rate: u32,
    channels: u16,
    duration_ms: u64,
    frequency_hz: f32,
) -> Result<PathBuf, hound::Error> {
    let path = dir.join(name);
    let spec = WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(&path, spec)?;

    let total_frames = (sample_rate as u64 * duration_ms) / 1000;
    let amplitude = 0.5 * i16::MAX as f32;
    for frame_idx in 0..total_frames {
        let t = frame_idx as f32 / sample_rate as f32;
        let value = ((2.0 * PI * frequency_hz * t).sin() * amplitude) as i16;
        for _ in 0..channels {
            writer.write_sample(value)?;
        }
    }

    writer.finalize()?;
    Ok(path)
}

/// Stereo 32-bit float ramp: frame `i` holds `(i / frames, -i / frames)`
///
/// Float samples survive decoding unchanged, so tests can identify exactly
/// which buffer frame was rendered.
pub fn generate_ramp_wav(
    dir: &Path,
    name: &str,
    sample_rate: u32,
    frames: u32,
) -> Result<PathBuf, hound::Error> {
    let path = dir.join(name);
    let spec = WavSpec {
        channels: 2,
        sample_rate,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };
    let mut writer = WavWriter::create(&path, spec)?;

    for i in 0..frames {
        let value = i as f32 / frames as f32;
        writer.write_sample(value)?;
        writer.write_sample(-value)?;
    }

    writer.finalize()?;
    Ok(path)
}

/// Constant-valued frames with one value per channel
pub fn generate_multichannel_wav(
    dir: &Path,
    name: &str,
    sample_rate: u32,
    channel_values: &[f32],
    frames: u32,
) -> Result<PathBuf, hound::Error> {
    let path = dir.join(name);
    let spec = WavSpec {
        channels: channel_values.len() as u16,
        sample_rate,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };
    let mut writer = WavWriter::create(&path, spec)?;

    for _ in 0..frames {
        for &value in channel_values {
            writer.write_sample(value)?;
        }
    }

    writer.finalize()?;
    Ok(path)
}
