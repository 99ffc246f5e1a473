use super::types::ExecutionEvent;
use crate::sequencer::StateCallback;
use crate::types::ExecutionState;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Broadcast-based event bus for execution state.
///
/// Slow subscribers miss events (lagged) rather than blocking the sequencer.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<ExecutionEvent>,
}

impl EventBus {
    /// Create a new EventBus with the given channel capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to all future events.
    ///
    /// A subscriber that falls behind by more than `capacity` events gets
    /// `RecvError::Lagged` on its next recv.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ExecutionEvent> {
        self.sender.subscribe()
    }

    /// Publish an event; returns how many subscribers got it.
    pub fn publish(&self, event: ExecutionEvent) -> usize {
        // no receivers is not an error here
        self.sender.send(event).unwrap_or(0)
    }

    /// Get the current number of active subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// State-change callback that republishes every snapshot on this bus.
    #[must_use]
    pub fn callback(&self) -> StateCallback {
        let bus = self.clone();
        Arc::new(move |state: &ExecutionState| -> anyhow::Result<()> {
            bus.publish(ExecutionEvent::ExecutionState(state.clone()));
            Ok(())
        })
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
