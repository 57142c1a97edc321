//! Loop session orchestration
//!
//! [`LoopSession::start`] wires a loaded buffer into a running session:
//!
//! 1. Transport created with loop boundaries over the full buffer
//! 2. Looping enabled and playback started
//! 3. LoopSync initialized from the initial segment and registered on the
//!    segment editor
//! 4. Cursor position sampling started
//! 5. An audio driver started to pull frames from the transport
//!
//! **Drivers:**
//! - `Device`: a mixer thread renders the transport into a lock-free ring
//!   buffer that the cpal callback drains. The cpal stream is not `Send`, so
//!   the stream lives on the mixer thread for its whole life.
//! - `Headless`: a tokio task renders the transport against the wall clock
//!   and discards the audio.

use crate::audio::output::AudioOutput;
use crate::audio::types::{AudioFrame, SharedBuffer};
use crate::context::PlaybackContext;
use crate::error::{Error, Result};
use crate::playback::editor::SegmentEditor;
use crate::playback::loop_sync::{LoopSync, LoopSyncObserver, LoopSyncSettings};
use crate::playback::position::{start_position_sampling, SamplingHandle};
use crate::playback::ring_buffer::{AudioRingBuffer, RingBufferStats};
use crate::playback::segment::{LoopBoundaries, Segment};
use crate::playback::transport::{LoopTransport, TransportHandle};
use crate::timeline::{Cursor, TimeContext};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::thread::JoinHandle as ThreadHandle;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use waveloop_common::config::TomlConfig;
use waveloop_common::events::{EventBus, PlaybackState};

/// Frames rendered per mixer pass
const MIXER_CHUNK_FRAMES: usize = 512;

/// Mixer sleep when the ring buffer is full enough
const MIXER_IDLE: Duration = Duration::from_millis(2);

/// Headless clock tick
const HEADLESS_TICK: Duration = Duration::from_millis(10);

/// Most ticks' worth of frames the headless driver renders at once
const HEADLESS_MAX_TICKS: u64 = 4;

/// How the transport is pulled
#[derive(Debug, Clone, PartialEq)]
pub enum DriverKind {
    /// cpal output device
    Device {
        device: Option<String>,
        ring_buffer_frames: usize,
    },
    /// No audio output; transport advanced by the wall clock
    Headless,
}

/// Everything [`LoopSession::start`] needs besides the buffer
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub segment: Segment,
    pub timeline_width: u32,
    pub looping: bool,
    pub clamp_to_buffer: bool,
    pub frame_interval: Duration,
    pub driver: DriverKind,
}

impl SessionSettings {
    pub fn from_config(config: &TomlConfig) -> Self {
        let driver = if config.playback.headless {
            DriverKind::Headless
        } else {
            DriverKind::Device {
                device: config.playback.device.clone(),
                ring_buffer_frames: config.playback.ring_buffer_frames,
            }
        };
        Self {
            segment: Segment::new(config.segment.start, config.segment.duration),
            timeline_width: config.timeline.width,
            looping: config.playback.looping,
            clamp_to_buffer: config.playback.clamp_to_buffer,
            frame_interval: Duration::from_millis(config.playback.frame_interval_ms),
            driver,
        }
    }

    pub fn headless(mut self) -> Self {
        self.driver = DriverKind::Headless;
        self
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::from_config(&TomlConfig::default())
    }
}

/// Snapshot for status reporting
#[derive(Debug, Clone, Copy)]
pub struct SessionStatus {
    pub state: PlaybackState,
    pub position: f64,
    pub cursor_x: f64,
    pub segment: Segment,
    pub loop_boundaries: LoopBoundaries,
    pub ring_buffer: Option<RingBufferStats>,
}

/// A running loop session
pub struct LoopSession {
    context: PlaybackContext,
    editor: SegmentEditor,
    cursor: Cursor,
    sampling: Option<SamplingHandle>,
    driver: Option<Driver>,
}

impl LoopSession {
    /// Start a session over `buffer`
    ///
    /// Must be called from within a tokio runtime. If the output device
    /// cannot be opened the session falls back to the headless driver.
    ///
    /// # Errors
    /// - `Error::Playback` for an empty buffer or zero timeline width
    /// - `Error::InvalidSegment` if the initial segment has no positive duration
    pub fn start(buffer: SharedBuffer, settings: SessionSettings) -> Result<Self> {
        let event_bus = EventBus::default();
        let context = PlaybackContext::new(buffer, event_bus.clone())?;
        let duration = context.duration();
        let time_context = TimeContext::new(settings.timeline_width, duration)?;

        let mut transport = context.transport().clone();
        transport.with(|t| -> Result<()> {
            t.set_loop_boundaries(LoopBoundaries::full(t.duration())?);
            t.set_looping(settings.looping);
            t.start();
            Ok(())
        })?;

        let mut sync = LoopSync::new(
            LoopSyncSettings::new(duration).with_clamp_to_buffer(settings.clamp_to_buffer),
        )
        .with_event_bus(event_bus.clone());
        if let Err(e) = sync.initialize(&settings.segment, &mut transport) {
            transport.with(|t| t.stop());
            return Err(e);
        }

        let mut editor =
            SegmentEditor::new(settings.segment, time_context).with_event_bus(event_bus);
        editor.subscribe(Box::new(LoopSyncObserver::new(sync, transport.clone())));

        let sampling = start_position_sampling(transport.clone(), settings.frame_interval);

        let driver = match &settings.driver {
            DriverKind::Headless => Driver::headless(transport, context.sample_rate()),
            DriverKind::Device {
                device,
                ring_buffer_frames,
            } => match Driver::device(
                transport.clone(),
                context.sample_rate(),
                device.clone(),
                *ring_buffer_frames,
            ) {
                Ok(driver) => driver,
                Err(e) => {
                    warn!("Audio output unavailable ({}), running headless", e);
                    Driver::headless(transport, context.sample_rate())
                }
            },
        };

        info!(
            "Loop session started: {:.3}s buffer at {}Hz, {} driver",
            duration,
            context.sample_rate(),
            driver.name()
        );

        Ok(Self {
            context,
            editor,
            cursor: Cursor::new(time_context),
            sampling: Some(sampling),
            driver: Some(driver),
        })
    }

    pub fn context(&self) -> &PlaybackContext {
        &self.context
    }

    pub fn transport(&self) -> &TransportHandle {
        self.context.transport()
    }

    pub fn event_bus(&self) -> &EventBus {
        self.context.event_bus()
    }

    /// Segment editor; edits propagate to the loop synchronously
    pub fn editor_mut(&mut self) -> &mut SegmentEditor {
        &mut self.editor
    }

    pub fn segment(&self) -> Segment {
        self.editor.segment()
    }

    /// Latest cursor position samples
    pub fn positions(&self) -> Option<tokio::sync::watch::Receiver<f64>> {
        self.sampling.as_ref().map(|s| s.positions())
    }

    /// Cursor at the most recent sample
    pub fn cursor(&mut self) -> Cursor {
        if let Some(sampling) = &self.sampling {
            self.cursor.update(sampling.latest());
        }
        self.cursor
    }

    pub fn driver_name(&self) -> &'static str {
        self.driver.as_ref().map(|d| d.name()).unwrap_or("stopped")
    }

    pub fn play(&self) {
        self.transport().with(|t| t.start());
    }

    pub fn stop(&self) {
        self.transport().with(|t| t.stop());
    }

    pub fn seek(&self, seconds: f64) {
        self.transport().with(|t| t.seek(seconds));
    }

    pub fn status(&mut self) -> SessionStatus {
        let cursor = self.cursor();
        let (state, position, loop_boundaries) = self
            .transport()
            .with(|t| (t.state(), t.current_position(), t.loop_boundaries()));
        SessionStatus {
            state,
            position,
            cursor_x: cursor.x(),
            segment: self.segment(),
            loop_boundaries,
            ring_buffer: self.driver.as_ref().and_then(|d| d.ring_buffer_stats()),
        }
    }

    /// Stop sampling, the driver, and the transport
    pub async fn shutdown(mut self) -> Result<()> {
        info!("Shutting down loop session");

        if let Some(sampling) = self.sampling.take() {
            let samples = sampling.stop().await?;
            debug!("Cursor sampled {} times", samples);
        }
        if let Some(driver) = self.driver.take() {
            driver.stop().await?;
        }
        self.stop();

        info!("Loop session stopped");
        Ok(())
    }
}

/// Running audio driver
enum Driver {
    Device {
        stop_flag: Arc<AtomicBool>,
        thread: ThreadHandle<()>,
        stats: Arc<Mutex<Option<RingBufferStats>>>,
    },
    Headless {
        stop_tx: oneshot::Sender<()>,
        task: JoinHandle<u64>,
    },
}

impl Driver {
    fn name(&self) -> &'static str {
        match self {
            Driver::Device { .. } => "device",
            Driver::Headless { .. } => "headless",
        }
    }

    fn ring_buffer_stats(&self) -> Option<RingBufferStats> {
        match self {
            Driver::Device { stats, .. } => *stats.lock().unwrap_or_else(|p| p.into_inner()),
            Driver::Headless { .. } => None,
        }
    }

    /// Open the device and start the mixer thread
    ///
    /// Blocks until the stream is running (or failed to start).
    fn device(
        transport: TransportHandle,
        sample_rate: u32,
        device: Option<String>,
        ring_buffer_frames: usize,
    ) -> Result<Self> {
        let stop_flag = Arc::new(AtomicBool::new(false));
        let stats = Arc::new(Mutex::new(None));
        let (ready_tx, ready_rx) = mpsc::sync_channel::<Result<()>>(1);

        let thread_stop = Arc::clone(&stop_flag);
        let thread_stats = Arc::clone(&stats);
        let thread = std::thread::Builder::new()
            .name("waveloop-mixer".to_string())
            .spawn(move || {
                let mut output = match AudioOutput::open(device.as_deref(), Some(sample_rate)) {
                    Ok(output) => output,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                if let Err(e) = check_device_rate(output.sample_rate(), sample_rate) {
                    let _ = ready_tx.send(Err(e));
                    return;
                }

                let (mut producer, mut consumer) =
                    AudioRingBuffer::new(Some(ring_buffer_frames)).split();
                if let Err(e) = output.start(move || consumer.pop().unwrap_or_default()) {
                    let _ = ready_tx.send(Err(e));
                    return;
                }
                let _ = ready_tx.send(Ok(()));

                let mut scratch = vec![AudioFrame::zero(); MIXER_CHUNK_FRAMES];
                while !thread_stop.load(Ordering::Relaxed) {
                    if output.has_error() {
                        error!("Audio device reported an error, mixer stopping");
                        break;
                    }
                    if !producer.needs_frames() {
                        std::thread::sleep(MIXER_IDLE);
                        continue;
                    }

                    let frames = producer.vacant_len().min(MIXER_CHUNK_FRAMES);
                    let chunk = &mut scratch[..frames];
                    transport.lock().render(chunk);
                    for frame in chunk.iter() {
                        producer.push(*frame);
                    }
                    *thread_stats.lock().unwrap_or_else(|p| p.into_inner()) =
                        Some(producer.stats());
                }

                output.stop();
            })
            .map_err(|e| Error::AudioOutput(format!("Failed to spawn mixer thread: {}", e)))?;

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Driver::Device {
                stop_flag,
                thread,
                stats,
            }),
            Ok(Err(e)) => {
                let _ = thread.join();
                Err(e)
            }
            Err(_) => {
                let _ = thread.join();
                Err(Error::AudioOutput(
                    "Mixer thread exited before the stream started".to_string(),
                ))
            }
        }
    }

    /// Advance the transport in real time without a device
    fn headless(transport: TransportHandle, sample_rate: u32) -> Self {
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(HEADLESS_TICK);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            let started = tokio::time::Instant::now();
            let max_frames = headless_max_frames(sample_rate);
            let mut rendered: u64 = 0;
            let mut scratch = Vec::new();

            loop {
                tokio::select! {
                    _ = &mut stop_rx => break,
                    _ = ticker.tick() => {
                        let due = (started.elapsed().as_secs_f64() * sample_rate as f64) as u64;
                        let frames = due.saturating_sub(rendered);
                        if frames == 0 {
                            continue;
                        }
                        if frames > max_frames {
                            debug!(
                                "Headless driver fell {} frames behind, skipping to the wall clock",
                                frames - max_frames
                            );
                        }
                        let frames = frames.min(max_frames) as usize;
                        scratch.resize(frames, AudioFrame::zero());
                        transport.lock().render(&mut scratch);
                        rendered = due;
                    }
                }
            }

            debug!("Headless driver stopped after {} frames of wall clock", rendered);
            rendered
        });

        Driver::Headless { stop_tx, task }
    }

    async fn stop(self) -> Result<()> {
        match self {
            Driver::Device {
                stop_flag, thread, ..
            } => {
                stop_flag.store(true, Ordering::Relaxed);
                tokio::task::spawn_blocking(move || thread.join())
                    .await
                    .map_err(|e| Error::Task(format!("Mixer join failed: {}", e)))?
                    .map_err(|_| Error::Task("Mixer thread panicked".to_string()))
            }
            Driver::Headless { stop_tx, task } => {
                let _ = stop_tx.send(());
                task.await
                    .map(|_| ())
                    .map_err(|e| Error::Task(format!("Headless driver failed: {}", e)))
            }
        }
    }
}

/// Frames the headless driver may render in one tick
fn headless_max_frames(sample_rate: u32) -> u64 {
    let per_tick = (sample_rate as u64 * HEADLESS_TICK.as_millis() as u64).div_ceil(1000);
    per_tick.max(1) * HEADLESS_MAX_TICKS
}

/// The mixer does not resample, so the device must run at the buffer's rate
fn check_device_rate(device_rate: u32, buffer_rate: u32) -> Result<()> {
    if device_rate == buffer_rate {
        return Ok(());
    }
    Err(Error::AudioOutput(format!(
        "Device runs at {}Hz but buffer is {}Hz",
        device_rate, buffer_rate
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::types::AudioBuffer;
    use crate::playback::transport::PlaybackTransport;

    fn buffer(seconds: usize) -> SharedBuffer {
        AudioBuffer::new(vec![0.0; seconds * 1000 * 2], 1000).into_shared()
    }

    fn settings() -> SessionSettings {
        SessionSettings {
            frame_interval: Duration::from_millis(5),
            ..SessionSettings::default()
        }
        .headless()
    }

    #[test]
    fn test_settings_from_config() {
        let mut config = TomlConfig::default();
        config.playback.headless = true;
        config.segment.start = 0.5;
        let settings = SessionSettings::from_config(&config);
        assert_eq!(settings.driver, DriverKind::Headless);
        assert_eq!(settings.segment, Segment::new(0.5, 2.0));
        assert_eq!(settings.frame_interval, Duration::from_millis(16));
        assert!(settings.looping);
    }

    #[tokio::test]
    async fn test_start_sets_initial_loop() {
        let session = LoopSession::start(buffer(5), settings()).unwrap();
        let (state, boundaries, looping) = session
            .transport()
            .with(|t| (t.state(), t.loop_boundaries(), t.is_looping()));
        assert_eq!(state, PlaybackState::Playing);
        assert!(looping);
        assert_eq!(boundaries, LoopBoundaries::new(1.0, 3.0).unwrap());
        assert_eq!(session.driver_name(), "headless");
        session.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_invalid_initial_segment_fails() {
        let mut settings = settings();
        settings.segment = Segment::new(1.0, 0.0);
        let result = LoopSession::start(buffer(5), settings);
        assert!(matches!(result, Err(Error::InvalidSegment { .. })));
    }

    #[tokio::test]
    async fn test_editor_drives_transport() {
        let mut session = LoopSession::start(buffer(5), settings()).unwrap();
        session.editor_mut().set_segment(Segment::new(2.0, 1.5));
        assert_eq!(
            session.transport().lock().loop_boundaries(),
            LoopBoundaries::new(2.0, 3.5).unwrap()
        );
        session.editor_mut().set_duration(-0.5);
        assert_eq!(
            session.transport().lock().loop_boundaries(),
            LoopBoundaries::new(2.0, 3.5).unwrap()
        );
        session.shutdown().await.unwrap();
    }

    #[test]
    fn test_headless_lag_cap() {
        assert_eq!(headless_max_frames(1000), 40);
        assert_eq!(headless_max_frames(44100), 441 * 4);
        assert_eq!(headless_max_frames(1), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_headless_stall_does_not_burst() {
        let mut transport = PlaybackTransport::new(buffer(5)).unwrap();
        transport.set_looping(true);
        transport.start();
        let transport = TransportHandle::new(transport);

        let driver = Driver::headless(transport.clone(), 1000);
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }

        // Ten minutes pass in one jump, as if the runtime was blocked
        tokio::time::advance(Duration::from_secs(600)).await;
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }
        driver.stop().await.unwrap();

        let played = transport.lock().frames_played();
        assert!(played > 0);
        assert!(played <= 2 * headless_max_frames(1000), "rendered {} frames", played);
    }

    #[test]
    fn test_device_rate_must_match_buffer() {
        assert!(check_device_rate(48000, 48000).is_ok());
        assert!(matches!(
            check_device_rate(44100, 48000),
            Err(Error::AudioOutput(_))
        ));
    }

    #[tokio::test]
    async fn test_shutdown_stops_transport() {
        let session = LoopSession::start(buffer(5), settings()).unwrap();
        let transport = session.transport().clone();
        session.shutdown().await.unwrap();
        assert_eq!(transport.lock().state(), PlaybackState::Stopped);
    }
}
