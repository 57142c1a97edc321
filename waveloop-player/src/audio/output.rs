//! Audio output using cpal
//!
//! Manages the audio device and a callback-based playback stream. The
//! callback pulls one [`AudioFrame`] at a time; in the player it is fed from
//! the ring buffer consumer so the real-time thread never takes a lock.

use crate::audio::types::AudioFrame;
use crate::error::{Error, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, FromSample, SampleFormat, SizedSample, Stream, StreamConfig};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Audio output manager using cpal.
pub struct AudioOutput {
    device: Device,
    config: StreamConfig,
    sample_format: SampleFormat,
    stream: Option<Stream>,
    /// Stream error flag - set by audio callback on error
    error_flag: Arc<AtomicBool>,
    /// Count of stream errors reported by the device
    error_count: Arc<AtomicU32>,
}

impl AudioOutput {
    /// List available audio output devices.
    pub fn list_devices() -> Result<Vec<String>> {
        let host = cpal::default_host();

        let devices: Vec<String> = host
            .output_devices()
            .map_err(|e| Error::AudioOutput(format!("Failed to enumerate devices: {}", e)))?
            .filter_map(|device| device.name().ok())
            .collect();

        debug!("Found {} output devices", devices.len());
        Ok(devices)
    }

    /// Open audio device for output.
    ///
    /// # Arguments
    /// - `device_name`: Optional device name (None = default device)
    /// - `preferred_rate`: Sample rate to request if the device supports it
    ///
    /// If the requested device is not found, falls back to the default device.
    pub fn open(device_name: Option<&str>, preferred_rate: Option<u32>) -> Result<Self> {
        let host = cpal::default_host();

        let device = match device_name {
            Some(name) => {
                let mut devices = host.output_devices().map_err(|e| {
                    Error::AudioOutput(format!("Failed to enumerate devices: {}", e))
                })?;

                match devices.find(|d| d.name().ok().as_deref() == Some(name)) {
                    Some(dev) => {
                        info!("Found requested audio device: {}", name);
                        dev
                    }
                    None => {
                        warn!(
                            "Requested device '{}' not found, falling back to default device",
                            name
                        );
                        host.default_output_device().ok_or_else(|| {
                            Error::AudioOutput(format!(
                                "Device '{}' not found and no default device available",
                                name
                            ))
                        })?
                    }
                }
            }
            None => host
                .default_output_device()
                .ok_or_else(|| Error::AudioOutput("No default output device found".to_string()))?,
        };

        let device_label = device.name().unwrap_or_else(|_| "Unknown".to_string());
        info!("Using audio device: {}", device_label);

        let (config, sample_format) = Self::get_best_config(&device, preferred_rate)?;

        debug!(
            "Audio config: sample_rate={}, channels={}, format={:?}",
            config.sample_rate.0, config.channels, sample_format
        );

        Ok(Self {
            device,
            config,
            sample_format,
            stream: None,
            error_flag: Arc::new(AtomicBool::new(false)),
            error_count: Arc::new(AtomicU32::new(0)),
        })
    }

    /// Sample rate the device would use by default
    ///
    /// Used to decode straight to the device rate before the stream opens.
    pub fn default_sample_rate(device_name: Option<&str>) -> Result<u32> {
        let output = Self::open(device_name, None)?;
        Ok(output.sample_rate())
    }

    /// Pick a stereo f32 config at `preferred_rate` if available, else the
    /// device default.
    fn get_best_config(
        device: &Device,
        preferred_rate: Option<u32>,
    ) -> Result<(StreamConfig, SampleFormat)> {
        if let Some(rate) = preferred_rate {
            let mut supported_configs = device
                .supported_output_configs()
                .map_err(|e| Error::AudioOutput(format!("Failed to get device configs: {}", e)))?;

            let preferred = supported_configs.find(|config| {
                config.channels() == 2
                    && config.min_sample_rate().0 <= rate
                    && config.max_sample_rate().0 >= rate
                    && config.sample_format() == SampleFormat::F32
            });

            if let Some(supported_config) = preferred {
                let sample_format = supported_config.sample_format();
                let config = supported_config
                    .with_sample_rate(cpal::SampleRate(rate))
                    .config();
                return Ok((config, sample_format));
            }
            debug!("Device does not support {}Hz stereo f32, using default config", rate);
        }

        let supported_config = device
            .default_output_config()
            .map_err(|e| Error::AudioOutput(format!("Failed to get default config: {}", e)))?;

        let sample_format = supported_config.sample_format();
        Ok((supported_config.config(), sample_format))
    }

    /// Output sample rate in Hz
    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate.0
    }

    /// True once the device reported a stream error
    pub fn has_error(&self) -> bool {
        self.error_flag.load(Ordering::SeqCst)
    }

    /// Start audio playback with callback.
    ///
    /// The callback runs on the real-time audio thread once per output frame.
    /// It must not block; return `AudioFrame::zero()` when nothing is ready.
    pub fn start<F>(&mut self, callback: F) -> Result<()>
    where
        F: FnMut() -> AudioFrame + Send + 'static,
    {
        info!("Starting audio stream");

        let stream = match self.sample_format {
            SampleFormat::F32 => self.build_stream::<f32, F>(callback)?,
            SampleFormat::I16 => self.build_stream::<i16, F>(callback)?,
            SampleFormat::U16 => self.build_stream::<u16, F>(callback)?,
            sample_format => {
                return Err(Error::AudioOutput(format!(
                    "Unsupported sample format: {:?}",
                    sample_format
                )));
            }
        };

        stream
            .play()
            .map_err(|e| Error::AudioOutput(format!("Failed to start stream: {}", e)))?;

        self.stream = Some(stream);
        info!("Audio stream started successfully");
        Ok(())
    }

    /// Stop and release the stream
    pub fn stop(&mut self) {
        if let Some(stream) = self.stream.take() {
            if let Err(e) = stream.pause() {
                warn!("Failed to pause audio stream: {}", e);
            }
            info!(
                "Audio stream stopped ({} device errors)",
                self.error_count.load(Ordering::SeqCst)
            );
        }
    }

    fn build_stream<T, F>(&self, callback: F) -> Result<Stream>
    where
        T: SizedSample + FromSample<f32>,
        F: FnMut() -> AudioFrame + Send + 'static,
    {
        let channels = self.config.channels as usize;
        let error_flag = Arc::clone(&self.error_flag);
        let error_count = Arc::clone(&self.error_count);
        let mut callback = callback;

        self.device
            .build_output_stream(
                &self.config,
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                    for frame in data.chunks_mut(channels) {
                        let audio_frame = callback();
                        let left = audio_frame.left.clamp(-1.0, 1.0);
                        let right = audio_frame.right.clamp(-1.0, 1.0);

                        frame[0] = T::from_sample(left);
                        if channels > 1 {
                            frame[1] = T::from_sample(right);
                        }
                        for sample in frame.iter_mut().skip(2) {
                            *sample = T::EQUILIBRIUM;
                        }
                    }
                },
                move |err| {
                    error!("Audio stream error: {}", err);
                    error_flag.store(true, Ordering::SeqCst);
                    error_count.fetch_add(1, Ordering::SeqCst);
                },
                None, // No timeout
            )
            .map_err(|e| Error::AudioOutput(format!("Failed to build stream: {}", e)))
    }
}

impl Drop for AudioOutput {
    fn drop(&mut self) {
        self.stop();
    }
}
