//! Bounded in-memory record of dispatch outcomes.

use cadence_core::{DispatchOutcome, DispatchStatus};
use serde::Serialize;
use std::collections::VecDeque;

/// Lifetime outcome counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OutcomeCounts {
    pub success: u64,
    pub failure: u64,
    pub timed_out: u64,
    pub skipped: u64,
}

impl OutcomeCounts {
    pub fn total(&self) -> u64 {
        self.success + self.failure + self.timed_out + self.skipped
    }
}

/// Keeps the most recent outcomes; counters cover everything ever recorded.
#[derive(Debug)]
pub struct OutcomeLog {
    recent: VecDeque<DispatchOutcome>,
    capacity: usize,
    counts: OutcomeCounts,
}

impl OutcomeLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            recent: VecDeque::with_capacity(capacity),
            capacity,
            counts: OutcomeCounts::default(),
        }
    }

    pub fn record(&mut self, outcome: DispatchOutcome) {
        match outcome.status {
            DispatchStatus::Success => self.counts.success += 1,
            DispatchStatus::Failure => self.counts.failure += 1,
            DispatchStatus::TimedOut => self.counts.timed_out += 1,
            DispatchStatus::Skipped => self.counts.skipped += 1,
        }
        if self.recent.len() == self.capacity {
            self.recent.pop_front();
        }
        self.recent.push_back(outcome);
    }

    /// Up to `n` outcomes, newest first.
    pub fn recent(&self, n: usize) -> Vec<DispatchOutcome> {
        self.recent.iter().rev().take(n).cloned().collect()
    }

    pub fn counts(&self) -> OutcomeCounts {
        self.counts
    }

    pub fn len(&self) -> usize {
        self.recent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recent.is_empty()
    }
}
