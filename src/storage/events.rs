//! Change notifications
//!
//! The store announces two kinds of change and does not know who listens.
//! Subscribers receive events over a standard channel; dropping the receiver
//! ends the subscription, and the sender is pruned on the next emission.

use std::sync::mpsc;

/// A change announced by the store
///
/// Events carry no payload: subscribers re-query the store for current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreEvent {
    /// The contents of at least one collection changed
    DataChanged,

    /// The dirty flag or the current file changed
    SaveStatusChanged,
}

/// Subscription list owned by the store
#[derive(Debug, Default)]
pub struct EventBus {
    subscribers: Vec<mpsc::Sender<StoreEvent>>,
}

impl EventBus {
    /// Create a bus with no subscribers
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new subscriber
    pub fn subscribe(&mut self) -> mpsc::Receiver<StoreEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    /// Deliver an event to every live subscriber
    pub fn emit(&mut self, event: StoreEvent) {
        let before = self.subscribers.len();
        self.subscribers.retain(|tx| tx.send(event).is_ok());

        let dropped = before - self.subscribers.len();
        if dropped > 0 {
            tracing::debug!(dropped, remaining = self.subscribers.len(), "Pruned closed subscribers");
        }
    }

    /// Number of subscribers still registered
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}
