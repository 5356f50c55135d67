//! Event Bus
//!
//! Broadcasts every agent event to external subscribers (transports, audit sinks). Listener
//! plugins are driven directly by the agent; the bus is for everything outside it.

use tokio::sync::broadcast;
use tracing::debug;
use veriforge_core::AgentEvent;

/// Default channel capacity for event subscribers.
pub const DEFAULT_EVENT_BUFFER: usize = 256;

#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<AgentEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { sender: tx }
    }

    /// Publish to all current subscribers. Returns how many received it.
    pub fn publish(&self, event: AgentEvent) -> usize {
        debug!(event_type = %event.event_type, id = %event.id, "Publishing event");
        self.sender.send(event).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AgentEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER)
    }
}
