//! Lock-free ring buffer for audio frames
//!
//! Single-producer single-consumer queue between the mixer thread (which
//! renders the transport) and the cpal callback. The callback side never
//! takes a lock.
//!
//! The buffer capacity bounds how far the audible output lags behind the
//! transport clock, so it also bounds how late a loop edit is heard.

use crate::audio::types::AudioFrame;
use ringbuf::{traits::*, HeapCons, HeapProd, HeapRb};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// ~93ms @ 44.1kHz
pub const DEFAULT_CAPACITY: usize = 4096;
const TARGET_FILL_MIN_PERCENT: f32 = 0.50;

#[derive(Debug, Default)]
struct Counters {
    underruns: AtomicU64,
    overruns: AtomicU64,
    /// Set once the producer first reached the target fill level; underruns
    /// before that are startup noise
    primed: AtomicBool,
}

/// Lock-free ring buffer for audio frames
pub struct AudioRingBuffer {
    buffer: HeapRb<AudioFrame>,
    counters: Arc<Counters>,
}

impl AudioRingBuffer {
    /// Create a ring buffer holding `capacity` frames (default
    /// [`DEFAULT_CAPACITY`])
    pub fn new(capacity: Option<usize>) -> Self {
        let capacity = capacity.unwrap_or(DEFAULT_CAPACITY).max(1);
        debug!("Creating audio ring buffer with capacity: {} frames", capacity);
        Self {
            buffer: HeapRb::new(capacity),
            counters: Arc::new(Counters::default()),
        }
    }

    /// Split into producer (mixer thread) and consumer (audio callback)
    pub fn split(self) -> (AudioProducer, AudioConsumer) {
        let (producer, consumer) = self.buffer.split();
        (
            AudioProducer {
                producer,
                counters: Arc::clone(&self.counters),
            },
            AudioConsumer {
                consumer,
                counters: self.counters,
            },
        )
    }
}

/// Producer half, owned by the mixer thread
pub struct AudioProducer {
    producer: HeapProd<AudioFrame>,
    counters: Arc<Counters>,
}

impl AudioProducer {
    /// Push one frame; returns false (and counts an overrun) if full
    pub fn push(&mut self, frame: AudioFrame) -> bool {
        match self.producer.try_push(frame) {
            Ok(()) => {
                if !self.counters.primed.load(Ordering::Relaxed) && !self.needs_frames() {
                    self.counters.primed.store(true, Ordering::Relaxed);
                    debug!("Audio ring buffer primed");
                }
                true
            }
            Err(_) => {
                let count = self.counters.overruns.fetch_add(1, Ordering::Relaxed) + 1;
                if count % 1000 == 0 {
                    warn!("Audio ring buffer overrun (total: {})", count);
                }
                false
            }
        }
    }

    pub fn occupied_len(&self) -> usize {
        self.producer.occupied_len()
    }

    pub fn capacity(&self) -> usize {
        self.producer.capacity().into()
    }

    /// Free slots the mixer can fill right now
    pub fn vacant_len(&self) -> usize {
        self.producer.vacant_len()
    }

    /// True while the fill level is below the target minimum
    pub fn needs_frames(&self) -> bool {
        let min = (self.capacity() as f32 * TARGET_FILL_MIN_PERCENT) as usize;
        self.occupied_len() < min
    }

    pub fn stats(&self) -> RingBufferStats {
        RingBufferStats {
            underruns: self.counters.underruns.load(Ordering::Relaxed),
            overruns: self.counters.overruns.load(Ordering::Relaxed),
            capacity: self.capacity(),
            occupied: self.occupied_len(),
        }
    }
}

/// Consumer half, owned by the audio callback
pub struct AudioConsumer {
    consumer: HeapCons<AudioFrame>,
    counters: Arc<Counters>,
}

impl AudioConsumer {
    /// Pop one frame; `None` on underrun (caller outputs silence)
    pub fn pop(&mut self) -> Option<AudioFrame> {
        match self.consumer.try_pop() {
            Some(frame) => Some(frame),
            None => {
                let count = self.counters.underruns.fetch_add(1, Ordering::Relaxed) + 1;
                if count % 1000 == 0 {
                    if self.counters.primed.load(Ordering::Relaxed) {
                        warn!(
                            "Audio ring buffer underrun during playback (total: {}) - mixer is not keeping up",
                            count
                        );
                    } else {
                        trace!("Audio ring buffer underrun during startup (total: {})", count);
                    }
                }
                None
            }
        }
    }

    pub fn occupied_len(&self) -> usize {
        self.consumer.occupied_len()
    }
}

/// Ring buffer statistics
#[derive(Debug, Clone, Copy)]
pub struct RingBufferStats {
    /// Callback found the buffer empty
    pub underruns: u64,
    /// Mixer found the buffer full
    pub overruns: u64,
    pub capacity: usize,
    pub occupied: usize,
}

impl RingBufferStats {
    /// Fill level (0.0 to 1.0)
    pub fn fill_percent(&self) -> f32 {
        if self.capacity == 0 {
            return 0.0;
        }
        self.occupied as f32 / self.capacity as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_pop_preserves_order() {
        let (mut producer, mut consumer) = AudioRingBuffer::new(Some(8)).split();
        assert!(producer.push(AudioFrame::new(0.1, 0.1)));
        assert!(producer.push(AudioFrame::new(0.2, 0.2)));
        assert_eq!(consumer.pop().unwrap().left, 0.1);
        assert_eq!(consumer.pop().unwrap().left, 0.2);
        assert_eq!(consumer.occupied_len(), 0);
    }

    #[test]
    fn test_underrun_counted() {
        let (producer, mut consumer) = AudioRingBuffer::new(Some(4)).split();
        assert!(consumer.pop().is_none());
        assert!(consumer.pop().is_none());
        assert_eq!(producer.stats().underruns, 2);
    }

    #[test]
    fn test_overrun_counted() {
        let (mut producer, _consumer) = AudioRingBuffer::new(Some(2)).split();
        assert!(producer.push(AudioFrame::zero()));
        assert!(producer.push(AudioFrame::zero()));
        assert!(!producer.push(AudioFrame::zero()));
        let stats = producer.stats();
        assert_eq!(stats.overruns, 1);
        assert_eq!(stats.occupied, 2);
        assert_eq!(stats.fill_percent(), 1.0);
    }

    #[test]
    fn test_needs_frames_below_half() {
        let (mut producer, _consumer) = AudioRingBuffer::new(Some(8)).split();
        assert!(producer.needs_frames());
        for _ in 0..4 {
            producer.push(AudioFrame::zero());
        }
        assert!(!producer.needs_frames());
        assert_eq!(producer.vacant_len(), 4);
    }
}
