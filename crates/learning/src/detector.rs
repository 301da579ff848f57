//! Repeated-subsequence detection over the recent event window.
//!
//! On every append the detector looks at the tails of the window that end at
//! the newest event. A tail is a repeat when an equal sequence already occurred
//! earlier in the window without overlapping it.

use cadence_config::{LearningConfig, Sensitivity};
use cadence_core::{Event, Signature};
use std::collections::HashSet;

/// A repeated sequence found in the window.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub signature: Signature,

    /// Non-overlapping occurrences visible in the window, the tail included
    pub occurrences: u64,
}

#[derive(Debug, Clone)]
pub struct PatternDetector {
    min_len: usize,
    window_size: usize,
    sensitivity: Sensitivity,
}

impl PatternDetector {
    pub fn new(config: &LearningConfig) -> Self {
        Self {
            min_len: config.min_pattern_length.max(2),
            window_size: config.pattern_window_size,
            sensitivity: config.detection_sensitivity,
        }
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Find every repeated tail of `window` (oldest first).
    ///
    /// Each signature is reported at most once, shortest first.
    pub fn detect(&self, window: &[&Event]) -> Vec<Detection> {
        let window = &window[window.len().saturating_sub(self.window_size)..];
        let max_len = (self.window_size / 2).min(window.len() / 2);
        let allow_gap = self.sensitivity == Sensitivity::Low;

        let mut seen: HashSet<Signature> = HashSet::new();
        let mut found = Vec::new();

        for len in self.min_len..=max_len {
            for tail in self.tails(window, len, allow_gap) {
                let signature: Signature = tail.reference.iter().map(|e| e.kind.clone()).collect();
                if seen.contains(&signature) {
                    continue;
                }
                let earlier = &window[..tail.start];
                if self.count(earlier, &tail.reference, allow_gap) == 0 {
                    continue;
                }
                let occurrences = self.count(window, &tail.reference, allow_gap).max(2);
                seen.insert(signature.clone());
                found.push(Detection {
                    signature,
                    occurrences: occurrences as u64,
                });
            }
        }
        found
    }

    /// Tails of length `len` ending at the newest event. With gaps allowed,
    /// also the tails of `len + 1` events where one interior event is foreign.
    fn tails<'a>(&self, window: &[&'a Event], len: usize, allow_gap: bool) -> Vec<Tail<'a>> {
        let n = window.len();
        let mut tails = Vec::new();
        if len * 2 > n {
            return tails;
        }
        tails.push(Tail {
            start: n - len,
            reference: window[n - len..].to_vec(),
        });
        if allow_gap && len + 1 + len <= n {
            let span = &window[n - len - 1..];
            for gap in 1..len {
                let reference: Vec<&Event> = span
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| *i != gap)
                    .map(|(_, e)| *e)
                    .collect();
                tails.push(Tail {
                    start: n - len - 1,
                    reference,
                });
            }
        }
        tails
    }

    /// Greedy count of non-overlapping occurrences of `reference` in `events`.
    fn count(&self, events: &[&Event], reference: &[&Event], allow_gap: bool) -> usize {
        let mut count = 0;
        let mut i = 0;
        while i < events.len() {
            match self.match_at(events, i, reference, allow_gap) {
                Some(end) => {
                    count += 1;
                    i = end;
                }
                None => i += 1,
            }
        }
        count
    }

    /// If `reference` occurs starting at `start`, the exclusive end index.
    fn match_at(
        &self,
        events: &[&Event],
        start: usize,
        reference: &[&Event],
        allow_gap: bool,
    ) -> Option<usize> {
        let len = reference.len();
        if start + len <= events.len()
            && reference
                .iter()
                .zip(&events[start..start + len])
                .all(|(r, e)| self.same(r, e))
        {
            return Some(start + len);
        }
        if !allow_gap || start + len + 1 > events.len() {
            return None;
        }
        for gap in 1..len {
            let span = &events[start..start + len + 1];
            let matches = span
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != gap)
                .map(|(_, e)| e)
                .zip(reference)
                .all(|(e, r)| self.same(r, e));
            if matches {
                return Some(start + len + 1);
            }
        }
        None
    }

    fn same(&self, a: &Event, b: &Event) -> bool {
        match self.sensitivity {
            Sensitivity::High => a.kind == b.kind && a.subject == b.subject,
            Sensitivity::Medium | Sensitivity::Low => a.kind == b.kind,
        }
    }
}

struct Tail<'a> {
    /// Index of the first event of the tail within the window
    start: usize,

    /// Events the tail is made of, gap removed
    reference: Vec<&'a Event>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_core::EventKind::{self, *};
    use chrono::Utc;

    fn events(items: &[(EventKind, &str)]) -> Vec<Event> {
        let now = Utc::now();
        items
            .iter()
            .enumerate()
            .map(|(i, (kind, subject))| Event {
                id: i as u64 + 1,
                kind: kind.clone(),
                subject: subject.to_string(),
                timestamp: now,
            })
            .collect()
    }

    fn detector(sensitivity: Sensitivity) -> PatternDetector {
        PatternDetector::new(&LearningConfig {
            detection_sensitivity: sensitivity,
            ..LearningConfig::default()
        })
    }

    fn signatures(found: &[Detection]) -> Vec<Signature> {
        found.iter().map(|d| d.signature.clone()).collect()
    }

    #[test]
    fn detects_repeated_pair() {
        let log = events(&[(Read, "a"), (Edit, "a"), (Read, "b"), (Edit, "b")]);
        let window: Vec<&Event> = log.iter().collect();
        let found = detector(Sensitivity::Medium).detect(&window);
        assert_eq!(signatures(&found), vec![vec![Read, Edit]]);
        assert_eq!(found[0].occurrences, 2);
    }

    #[test]
    fn overlapping_occurrence_is_not_a_repeat() {
        // Read Read Read: the tail [Read, Read] only overlaps the earlier pair
        let log = events(&[(Read, "a"), (Read, "b"), (Read, "c")]);
        let window: Vec<&Event> = log.iter().collect();
        assert!(detector(Sensitivity::Medium).detect(&window).is_empty());
    }

    #[test]
    fn high_sensitivity_compares_subjects() {
        let log = events(&[(Read, "a"), (Edit, "a"), (Read, "b"), (Edit, "b")]);
        let window: Vec<&Event> = log.iter().collect();
        assert!(detector(Sensitivity::High).detect(&window).is_empty());

        let log = events(&[(Read, "a"), (Edit, "a"), (Read, "a"), (Edit, "a")]);
        let window: Vec<&Event> = log.iter().collect();
        assert_eq!(detector(Sensitivity::High).detect(&window).len(), 1);
    }

    #[test]
    fn low_sensitivity_tolerates_one_inserted_event() {
        let log = events(&[
            (Read, "a"),
            (Grep, "x"),
            (Edit, "a"),
            (Write, "z"),
            (Read, "b"),
            (Edit, "b"),
        ]);
        let window: Vec<&Event> = log.iter().collect();
        assert!(detector(Sensitivity::Medium).detect(&window).is_empty());
        let found = detector(Sensitivity::Low).detect(&window);
        assert!(signatures(&found).contains(&vec![Read, Edit]));
    }

    #[test]
    fn occurrences_count_whole_window() {
        let log = events(&[
            (Read, "a"),
            (Edit, "a"),
            (Read, "b"),
            (Edit, "b"),
            (Read, "c"),
            (Edit, "c"),
        ]);
        let window: Vec<&Event> = log.iter().collect();
        let found = detector(Sensitivity::Medium).detect(&window);
        let pair = found.iter().find(|d| d.signature == vec![Read, Edit]).unwrap();
        assert_eq!(pair.occurrences, 3);
    }

    #[test]
    fn unknown_kinds_are_distinct_symbols() {
        let log = events(&[
            (EventKind::from("Bash"), "ls"),
            (Edit, "a"),
            (EventKind::from("Bash"), "ls"),
            (Edit, "b"),
        ]);
        let window: Vec<&Event> = log.iter().collect();
        let found = detector(Sensitivity::Medium).detect(&window);
        assert_eq!(signatures(&found), vec![vec![EventKind::from("Bash"), Edit]]);
    }
}
