//! Audio buffer loading using symphonia
//!
//! Decodes a whole audio file (WAV, MP3, FLAC, AAC/MP4, Vorbis) into an
//! in-memory stereo f32 [`AudioBuffer`].
//!
//! # Sample Format
//!
//! - Output: Stereo f32 samples (interleaved: [L, R, L, R, ...])
//! - Mono files: duplicated to stereo
//! - Multi-channel: downmixed to stereo (even channels left, odd channels right)

use crate::audio::resampler::Resampler;
use crate::audio::types::AudioBuffer;
use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, info, warn};

/// Loads audio files into memory
///
/// Decoding is CPU-bound and runs on tokio's blocking pool so the async
/// runtime stays responsive.
///
/// # Examples
///
/// ```ignore
/// let loader = AudioBufferLoader::new().with_target_sample_rate(48000);
/// let buffer = loader.load("assets/drum-loop.wav").await?;
/// println!("{:.2}s at {}Hz", buffer.duration(), buffer.sample_rate());
/// ```
#[derive(Debug, Clone, Default)]
pub struct AudioBufferLoader {
    /// Resample to this rate after decoding (None = keep native rate)
    target_sample_rate: Option<u32>,
}

impl AudioBufferLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resample loaded buffers to `rate`
    pub fn with_target_sample_rate(mut self, rate: u32) -> Self {
        self.target_sample_rate = Some(rate);
        self
    }

    /// Load and decode `path`
    ///
    /// # Errors
    /// - `Error::FileNotFound` if the file cannot be opened
    /// - `Error::Decode` for unsupported formats or files without audio frames
    /// - `Error::Resample` if rate conversion fails
    pub async fn load(&self, path: impl AsRef<Path>) -> Result<AudioBuffer> {
        let path = path.as_ref().to_path_buf();
        let target_rate = self.target_sample_rate;

        let buffer = tokio::task::spawn_blocking(move || -> Result<AudioBuffer> {
            let (samples, native_rate) = decode_file(&path)?;
            let samples = match target_rate {
                Some(rate) if rate != native_rate => {
                    Resampler::resample(&samples, native_rate, rate, 2)?
                }
                _ => samples,
            };
            let buffer = AudioBuffer::new(samples, target_rate.unwrap_or(native_rate));
            if buffer.frame_count() == 0 {
                return Err(Error::Decode(format!(
                    "No audio frames decoded from {}",
                    path.display()
                )));
            }
            Ok(buffer)
        })
        .await
        .map_err(|e| Error::Task(format!("Decode task failed: {}", e)))??;

        info!(
            "Loaded audio buffer: {:.3}s, {} frames at {}Hz",
            buffer.duration(),
            buffer.frame_count(),
            buffer.sample_rate()
        );
        Ok(buffer)
    }
}

/// Decode an entire file to interleaved stereo f32 samples
///
/// # Returns
/// - `samples`: Interleaved stereo f32 samples
/// - `sample_rate`: Native sample rate of the file
pub fn decode_file(path: &PathBuf) -> Result<(Vec<f32>, u32)> {
    debug!("Decoding entire file: {}", path.display());

    let file = std::fs::File::open(path).map_err(|_| Error::FileNotFound(path.clone()))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    // Create a hint to help the format registry guess the format
    let mut hint = Hint::new();
    if let Some(ext_str) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext_str);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| Error::Decode(format!("Failed to probe {}: {}", path.display(), e)))?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| Error::Decode(format!("No audio track found in {}", path.display())))?;

    let track_id = track.id;
    let codec_params = track.codec_params.clone();

    let sample_rate = codec_params
        .sample_rate
        .ok_or_else(|| Error::Decode("Sample rate not found".to_string()))?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|e| Error::Decode(format!("Failed to create decoder: {}", e)))?;

    let mut samples = Vec::new();
    let mut sample_buf: Option<SampleBuffer<f32>> = None;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                debug!("Reached end of file");
                break;
            }
            Err(SymphoniaError::ResetRequired) => {
                warn!("Stream reset required, stopping decode");
                break;
            }
            Err(e) => {
                warn!("Error reading packet: {}", e);
                break;
            }
        };

        // Skip packets for other tracks
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(e)) => {
                // Corrupt packet, skip it
                warn!("Decode error: {}", e);
                continue;
            }
            Err(e) => {
                return Err(Error::Decode(format!("Decoder failed: {}", e)));
            }
        };

        let spec = *decoded.spec();
        let channels = spec.channels.count();
        let buf = sample_buf.get_or_insert_with(|| {
            SampleBuffer::<f32>::new(decoded.capacity() as u64, spec)
        });
        if buf.capacity() < decoded.capacity() * channels {
            *buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
        }
        buf.copy_interleaved_ref(decoded);
        fold_to_stereo(buf.samples(), channels, &mut samples);
    }

    debug!(
        "Decoded {} stereo frames at {}Hz",
        samples.len() / 2,
        sample_rate
    );

    Ok((samples, sample_rate))
}

/// Append `interleaved` (with `channels` channels) to `output` as stereo
fn fold_to_stereo(interleaved: &[f32], channels: usize, output: &mut Vec<f32>) {
    match channels {
        0 => {}
        1 => {
            output.reserve(interleaved.len() * 2);
            for &sample in interleaved {
                output.push(sample);
                output.push(sample);
            }
        }
        2 => output.extend_from_slice(interleaved),
        _ => {
            let left_count = channels.div_ceil(2) as f32;
            let right_count = (channels / 2) as f32;
            for frame in interleaved.chunks_exact(channels) {
                let mut left = 0.0f32;
                let mut right = 0.0f32;
                for (ch, &sample) in frame.iter().enumerate() {
                    if ch % 2 == 0 {
                        left += sample;
                    } else {
                        right += sample;
                    }
                }
                output.push(left / left_count);
                output.push(right / right_count);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fold_mono_to_stereo() {
        let mut out = Vec::new();
        fold_to_stereo(&[0.1, 0.2], 1, &mut out);
        assert_eq!(out, vec![0.1, 0.1, 0.2, 0.2]);
    }

    #[test]
    fn test_fold_stereo_passthrough() {
        let mut out = vec![0.5, 0.5];
        fold_to_stereo(&[0.1, 0.2, 0.3, 0.4], 2, &mut out);
        assert_eq!(out, vec![0.5, 0.5, 0.1, 0.2, 0.3, 0.4]);
    }

    #[test]
    fn test_fold_four_channels() {
        let mut out = Vec::new();
        fold_to_stereo(&[0.2, 0.4, 0.6, 0.8], 4, &mut out);
        assert_eq!(out.len(), 2);
        assert!((out[0] - 0.4).abs() < 1e-6);
        assert!((out[1] - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_fold_three_channels() {
        let mut out = Vec::new();
        fold_to_stereo(&[0.2, 0.5, 0.4], 3, &mut out);
        assert!((out[0] - 0.3).abs() < 1e-6);
        assert!((out[1] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_decode_nonexistent_file() {
        let result = decode_file(&PathBuf::from("/nonexistent/file.wav"));
        assert!(matches!(result, Err(Error::FileNotFound(_))));
    }

    #[tokio::test]
    async fn test_load_nonexistent_file() {
        let result = AudioBufferLoader::new().load("/nonexistent/drum-loop.wav").await;
        assert!(matches!(result, Err(Error::FileNotFound(_))));
    }
}
