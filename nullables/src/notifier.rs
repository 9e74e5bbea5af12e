//! Nullable notifier: records events instead of delivering them.

use consensus_store::Notifier;
use consensus_types::EngineEvent;
use std::sync::Mutex;

#[derive(Default)]
pub struct NullNotifier {
    events: Mutex<Vec<EngineEvent>>,
}

impl NullNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// All events emitted so far, in order.
    pub fn events(&self) -> Vec<EngineEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Names of all events emitted so far (`"vote_cast"`, ...).
    pub fn event_names(&self) -> Vec<&'static str> {
        self.events.lock().unwrap().iter().map(|e| e.name()).collect()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }
}

impl Notifier for NullNotifier {
    fn notify(&self, event: &EngineEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}
