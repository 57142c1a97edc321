//! Per-frame playback position sampling
//!
//! A tokio task reads the transport position once per tick and publishes it
//! on a `watch` channel for the cursor. The task is owned by a
//! [`SamplingHandle`]: stop it explicitly with [`SamplingHandle::stop`], or
//! drop the handle to abort it.

use crate::error::{Error, Result};
use crate::playback::transport::LoopTransport;
use std::time::Duration;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, trace};

/// ~60 samples per second
pub const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// Start sampling `transport` every `period`
///
/// Must be called from within a tokio runtime. The first sample is taken
/// immediately.
pub fn start_position_sampling<T>(transport: T, period: Duration) -> SamplingHandle
where
    T: LoopTransport + Send + 'static,
{
    let period = if period.is_zero() {
        DEFAULT_FRAME_INTERVAL
    } else {
        period
    };
    let (position_tx, position_rx) = watch::channel(transport.current_position());
    let (stop_tx, mut stop_rx) = oneshot::channel::<()>();

    debug!("Starting position sampling every {:?}", period);

    let task = tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut samples: u64 = 0;

        loop {
            tokio::select! {
                _ = &mut stop_rx => break,
                _ = ticker.tick() => {
                    let position = transport.current_position();
                    trace!(position, "Cursor sample");
                    position_tx.send_replace(position);
                    samples += 1;
                }
            }
        }

        debug!("Position sampling stopped after {} samples", samples);
        samples
    });

    SamplingHandle {
        positions: position_rx,
        stop_tx: Some(stop_tx),
        task: Some(task),
    }
}

/// Cancellable handle to a running sampling task
pub struct SamplingHandle {
    positions: watch::Receiver<f64>,
    stop_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<u64>>,
}

impl SamplingHandle {
    /// Receiver of the latest sampled position
    pub fn positions(&self) -> watch::Receiver<f64> {
        self.positions.clone()
    }

    /// Most recent sample
    pub fn latest(&self) -> f64 {
        *self.positions.borrow()
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Stop sampling and wait for the task; returns the number of samples
    pub async fn stop(mut self) -> Result<u64> {
        if let Some(stop_tx) = self.stop_tx.take() {
            // The task may already be gone
            let _ = stop_tx.send(());
        }
        match self.task.take() {
            Some(task) => task
                .await
                .map_err(|e| Error::Task(format!("Position sampling task failed: {}", e))),
            None => Ok(0),
        }
    }
}

impl Drop for SamplingHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::segment::LoopBoundaries;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;

    /// Position stored as f64 bits so tests can move it from outside
    #[derive(Clone, Default)]
    struct SharedPosition(Arc<AtomicU64>);

    impl SharedPosition {
        fn set(&self, seconds: f64) {
            self.0.store(seconds.to_bits(), Ordering::SeqCst);
        }
    }

    impl LoopTransport for SharedPosition {
        fn set_loop_boundaries(&mut self, _boundaries: LoopBoundaries) {}

        fn current_position(&self) -> f64 {
            f64::from_bits(self.0.load(Ordering::SeqCst))
        }
    }

    #[tokio::test]
    async fn test_samples_follow_transport() {
        let position = SharedPosition::default();
        let handle = start_position_sampling(position.clone(), Duration::from_millis(5));
        let mut rx = handle.positions();

        position.set(1.25);
        tokio::time::timeout(Duration::from_secs(2), rx.wait_for(|p| *p == 1.25))
            .await
            .expect("sample not observed")
            .unwrap();
        assert_eq!(handle.latest(), 1.25);

        let samples = handle.stop().await.unwrap();
        assert!(samples >= 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sample_rate_follows_interval() {
        let handle = start_position_sampling(SharedPosition::default(), Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(95)).await;
        let samples = handle.stop().await.unwrap();
        // Ticks at 0, 10, ..., 90
        assert!((9..=11).contains(&samples), "got {} samples", samples);
    }

    #[tokio::test]
    async fn test_stop_ends_task() {
        let handle = start_position_sampling(SharedPosition::default(), Duration::from_millis(5));
        assert!(handle.is_running());
        handle.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_drop_aborts_task() {
        let handle = start_position_sampling(SharedPosition::default(), Duration::from_millis(5));
        let mut rx = handle.positions();
        drop(handle);
        // Sender goes away with the aborted task
        let closed = tokio::time::timeout(Duration::from_secs(2), async {
            while rx.changed().await.is_ok() {}
        })
        .await;
        assert!(closed.is_ok());
    }
}
