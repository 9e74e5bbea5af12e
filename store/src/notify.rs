//! Notification sink trait.

use consensus_types::EngineEvent;

/// Fire-and-forget delivery of engine events to external watchers.
///
/// Called while the engine holds its state lock, so implementations must not
/// block and must not call back into the engine.
pub trait Notifier: Send + Sync {
    fn notify(&self, event: &EngineEvent);
}
