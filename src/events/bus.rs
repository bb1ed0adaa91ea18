//! Event bus using channels
//!
//! One bus is created per process and handed to the engine by reference.
//! Each subscriber owns a channel receiver; emitting never blocks, and
//! subscribers that have been dropped are pruned on the next emit.

use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::Mutex;

use tracing::warn;

use super::event::EngineEvent;

/// Publish-subscribe hub for engine events
#[derive(Default)]
pub struct EventBus {
    senders: Mutex<Vec<Sender<EngineEvent>>>,
}

impl EventBus {
    /// Create a new event bus with no subscribers
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to events emitted after this call
    pub fn subscribe(&self) -> EventSubscriber {
        let (sender, receiver) = mpsc::channel();
        match self.senders.lock() {
            Ok(mut senders) => senders.push(sender),
            Err(e) => warn!("event bus lock poisoned, subscriber not registered: {}", e),
        }
        EventSubscriber { receiver }
    }

    /// Emit an event to all subscribers
    ///
    /// Fire and forget: with no subscribers the event is dropped.
    pub fn emit(&self, event: EngineEvent) {
        let Ok(mut senders) = self.senders.lock() else {
            warn!("event bus lock poisoned, dropping event");
            return;
        };
        senders.retain(|sender| sender.send(event.clone()).is_ok());
    }

    /// Get the number of live subscribers
    pub fn subscriber_count(&self) -> usize {
        self.senders.lock().map(|s| s.len()).unwrap_or(0)
    }
}

/// Subscriber to the event bus
pub struct EventSubscriber {
    receiver: Receiver<EngineEvent>,
}

impl EventSubscriber {
    /// Receive the next event without blocking
    pub fn try_recv(&self) -> Option<EngineEvent> {
        match self.receiver.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Collect every event currently queued
    pub fn drain(&self) -> Vec<EngineEvent> {
        self.receiver.try_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CollectionName;
    use crate::storage::CollectionPhase;

    fn phase_event(phase: CollectionPhase) -> EngineEvent {
        EngineEvent::CollectionPhaseChanged {
            collection: CollectionName::Subjects,
            phase,
        }
    }

    #[test]
    fn test_event_bus_basic() {
        let bus = EventBus::new();
        let sub = bus.subscribe();

        bus.emit(phase_event(CollectionPhase::Clearing));

        assert_eq!(sub.try_recv(), Some(phase_event(CollectionPhase::Clearing)));
        assert_eq!(sub.try_recv(), None);
    }

    #[test]
    fn test_multiple_subscribers() {
        let bus = EventBus::new();
        let sub1 = bus.subscribe();
        let sub2 = bus.subscribe();

        bus.emit(phase_event(CollectionPhase::Done));

        assert_eq!(sub1.drain().len(), 1);
        assert_eq!(sub2.drain().len(), 1);
    }

    #[test]
    fn test_no_subscribers_no_panic() {
        let bus = EventBus::new();
        bus.emit(phase_event(CollectionPhase::Pending));
    }

    #[test]
    fn test_dropped_subscribers_are_pruned() {
        let bus = EventBus::new();
        let sub = bus.subscribe();
        {
            let _gone = bus.subscribe();
        }
        assert_eq!(bus.subscriber_count(), 2);

        bus.emit(phase_event(CollectionPhase::Failed));
        assert_eq!(bus.subscriber_count(), 1);
        assert_eq!(sub.drain().len(), 1);
    }
}
