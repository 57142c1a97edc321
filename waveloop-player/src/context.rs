//! Explicit playback context
//!
//! Constructed once per session and handed to every component that needs
//! the transport or the event bus. There are no process-wide singletons.

use crate::audio::types::SharedBuffer;
use crate::error::Result;
use crate::playback::transport::{PlaybackTransport, TransportHandle};
use waveloop_common::events::EventBus;

/// Shared handles for one playback session
#[derive(Debug, Clone)]
pub struct PlaybackContext {
    transport: TransportHandle,
    event_bus: EventBus,
    sample_rate: u32,
}

impl PlaybackContext {
    /// Create the transport for `buffer` and wire it to `event_bus`
    pub fn new(buffer: SharedBuffer, event_bus: EventBus) -> Result<Self> {
        let sample_rate = buffer.sample_rate();
        let transport = PlaybackTransport::new(buffer)?.with_event_bus(event_bus.clone());
        Ok(Self {
            transport: TransportHandle::new(transport),
            event_bus,
            sample_rate,
        })
    }

    pub fn transport(&self) -> &TransportHandle {
        &self.transport
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// Rate of the transport clock (and of the output stream)
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Buffer duration in seconds
    pub fn duration(&self) -> f64 {
        self.transport.lock().duration()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::types::AudioBuffer;
    use crate::playback::transport::LoopTransport;

    #[test]
    fn test_context_shares_transport() {
        let buffer = AudioBuffer::new(vec![0.0; 2 * 48000], 48000).into_shared();
        let ctx = PlaybackContext::new(buffer, EventBus::new(4)).unwrap();
        let other = ctx.clone();

        other.transport().with(|t| t.seek(0.5));
        assert_eq!(ctx.transport().current_position(), 0.5);
        assert_eq!(ctx.sample_rate(), 48000);
        assert_eq!(ctx.duration(), 1.0);
    }
}
