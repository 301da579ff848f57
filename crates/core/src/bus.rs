//! Domain events for learning, dispatch and persistence.
//!
//! Events are published when something interesting happens in the engine.
//! Logging and telemetry collaborators subscribe without tight coupling; the
//! engine only guarantees that it emits them.

use crate::hook::DispatchOutcome;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

/// All domain events in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DomainEvent {
    /// A pattern was created or reinforced
    PatternUpdated {
        signature: String,
        occurrences: u64,
        confidence: f64,
        timestamp: DateTime<Utc>,
    },

    /// A pattern was dropped to respect the library capacity
    PatternEvicted {
        signature: String,
        confidence: f64,
        timestamp: DateTime<Utc>,
    },

    /// A hook was accepted by the dispatcher
    HookDispatched {
        request_id: u64,
        binding_id: String,
        predicted: String,
        confidence: f64,
        timestamp: DateTime<Utc>,
    },

    /// A dispatch request reached its terminal status
    HookCompleted { outcome: DispatchOutcome },

    /// Learned state was written to disk
    SnapshotPersisted {
        path: String,
        patterns: usize,
        relevance: usize,
        timestamp: DateTime<Utc>,
    },

    /// Writing learned state failed; retried on the next interval
    SnapshotFailed {
        reason: String,
        timestamp: DateTime<Utc>,
    },
}

/// A broadcast-based event bus for domain events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub.
/// Slow subscribers lag and lose events; publishers never block.
pub struct EventBus {
    sender: broadcast::Sender<Arc<DomainEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: DomainEvent) {
        // No subscribers is fine
        let _ = self.sender.send(Arc::new(event));
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<DomainEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn event_bus_publish_subscribe() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        bus.publish(DomainEvent::PatternUpdated {
            signature: "Read -> Edit".into(),
            occurrences: 3,
            confidence: 0.49,
            timestamp: Utc::now(),
        });

        let event = rx.recv().await.unwrap();
        match event.as_ref() {
            DomainEvent::PatternUpdated {
                signature,
                occurrences,
                ..
            } => {
                assert_eq!(signature, "Read -> Edit");
                assert_eq!(*occurrences, 3);
            }
            _ => panic!("Expected PatternUpdated event"),
        }
    }

    #[test]
    fn event_bus_no_subscribers_doesnt_panic() {
        let bus = EventBus::new(16);
        bus.publish(DomainEvent::SnapshotFailed {
            reason: "disk full".into(),
            timestamp: Utc::now(),
        });
    }
}
