//! Bounded, append-only log of observed events.

use cadence_core::{Event, EventKind};
use chrono::{DateTime, Utc};
use std::collections::VecDeque;

/// Ring of the most recent events.
///
/// Ids are monotonic across the lifetime of the log, including events that
/// have already been dropped. Timestamps never go backwards.
#[derive(Debug)]
pub struct EventLog {
    events: VecDeque<Event>,
    capacity: usize,
    next_id: u64,
    dropped: u64,
}

impl EventLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: VecDeque::with_capacity(capacity),
            capacity,
            next_id: 1,
            dropped: 0,
        }
    }

    /// Append an event and return the stored copy. Never rejects.
    pub fn append(
        &mut self,
        kind: EventKind,
        subject: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Event {
        let timestamp = match self.events.back() {
            Some(prev) if timestamp < prev.timestamp => prev.timestamp,
            _ => timestamp,
        };

        let event = Event {
            id: self.next_id,
            kind,
            subject: subject.into(),
            timestamp,
        };
        self.next_id += 1;

        if self.events.len() == self.capacity {
            self.events.pop_front();
            self.dropped += 1;
        }
        self.events.push_back(event.clone());
        event
    }

    /// The last `n` (or fewer) events, oldest first.
    pub fn window(&self, n: usize) -> impl DoubleEndedIterator<Item = &Event> + ExactSizeIterator {
        let start = self.events.len().saturating_sub(n);
        self.events.range(start..)
    }

    /// Kinds of the last `n` events, oldest first.
    pub fn tail_kinds(&self, n: usize) -> Vec<EventKind> {
        self.window(n).map(|e| e.kind.clone()).collect()
    }

    pub fn last(&self) -> Option<&Event> {
        self.events.back()
    }

    /// Number of events lost to the capacity ceiling.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
