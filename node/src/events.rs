//! Fan-out of engine events to in-process listeners.

use consensus_store::Notifier;
use consensus_types::EngineEvent;

/// Synchronous fan-out event bus for engine events.
///
/// Listeners are invoked inline while the emitting engine holds its lock;
/// keep handlers fast and never call back into an engine.
pub struct EventBus {
    listeners: Vec<Box<dyn Fn(&EngineEvent) + Send + Sync>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }

    pub fn subscribe(&mut self, listener: Box<dyn Fn(&EngineEvent) + Send + Sync>) {
        self.listeners.push(listener);
    }

    pub fn emit(&self, event: &EngineEvent) {
        tracing::trace!(event = event.name(), "engine event");
        for listener in &self.listeners {
            listener(event);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier for EventBus {
    fn notify(&self, event: &EngineEvent) {
        self.emit(event);
    }
}
