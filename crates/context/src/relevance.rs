//! Recency and frequency weighted ranking of touched files.

use cadence_config::ContextConfig;
use cadence_core::{Event, RelevanceEntry};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Clone)]
struct Entry {
    touches: u64,
    last_touched: DateTime<Utc>,
}

/// Bounded cache of file subjects ranked by
/// `recency_weight * 0.5^(age / half_life) + frequency_weight * touches / total`.
///
/// Entries below the relevance threshold stay stored but are never surfaced.
#[derive(Debug)]
pub struct RelevanceCache {
    entries: HashMap<String, Entry>,
    total_touches: u64,
    max_entries: usize,
    threshold: f64,
    recency_weight: f64,
    frequency_weight: f64,
    half_life_hours: f64,
}

impl RelevanceCache {
    pub fn new(config: &ContextConfig) -> Self {
        Self {
            entries: HashMap::new(),
            total_touches: 0,
            max_entries: config.max_relevant_files.max(1),
            threshold: config.relevance_threshold,
            recency_weight: config.recency_weight,
            frequency_weight: config.frequency_weight,
            half_life_hours: config.half_life_hours,
        }
    }

    /// Record an event. Only file-access kinds with a subject count.
    pub fn observe(&mut self, event: &Event) -> bool {
        if !event.kind.is_file_access() || event.subject.trim().is_empty() {
            return false;
        }
        self.touch(&event.subject, event.timestamp);
        true
    }

    /// Insert or bump `subject`, evicting the lowest-scoring entry when full.
    pub fn touch(&mut self, subject: &str, at: DateTime<Utc>) {
        let entry = self.entries.entry(subject.to_string()).or_insert(Entry {
            touches: 0,
            last_touched: at,
        });
        entry.touches += 1;
        if at > entry.last_touched {
            entry.last_touched = at;
        }
        self.total_touches += 1;

        while self.entries.len() > self.max_entries {
            let Some(victim) = self.weakest(at) else { break };
            if let Some(removed) = self.entries.remove(&victim) {
                self.total_touches = self.total_touches.saturating_sub(removed.touches);
                debug!(subject = %victim, "Relevance entry evicted");
            }
        }
    }

    /// Score of `subject` at `now`, if stored.
    pub fn score(&self, subject: &str, now: DateTime<Utc>) -> Option<f64> {
        self.entries.get(subject).map(|e| self.score_entry(e, now))
    }

    /// Up to `k` entries at or above the threshold, best first.
    ///
    /// `k` is capped at the cache capacity. Ties go to the most recent touch.
    pub fn top_k(&self, k: usize, now: DateTime<Utc>) -> Vec<RelevanceEntry> {
        let k = k.min(self.max_entries);
        let mut ranked: Vec<RelevanceEntry> = self
            .entries(now)
            .into_iter()
            .filter(|e| e.score >= self.threshold)
            .collect();
        ranked.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then(b.last_touched.cmp(&a.last_touched))
                .then_with(|| a.subject.cmp(&b.subject))
        });
        ranked.truncate(k);
        ranked
    }

    /// Every stored entry scored at `now`, in subject order.
    pub fn entries(&self, now: DateTime<Utc>) -> Vec<RelevanceEntry> {
        let mut all: Vec<RelevanceEntry> = self
            .entries
            .iter()
            .map(|(subject, e)| RelevanceEntry {
                subject: subject.clone(),
                score: self.score_entry(e, now),
                touches: e.touches,
                last_touched: e.last_touched,
            })
            .collect();
        all.sort_by(|a, b| a.subject.cmp(&b.subject));
        all
    }

    /// Replace the cache contents wholesale.
    pub fn restore(&mut self, entries: Vec<RelevanceEntry>) {
        self.entries = entries
            .into_iter()
            .map(|e| {
                (
                    e.subject,
                    Entry {
                        touches: e.touches.max(1),
                        last_touched: e.last_touched,
                    },
                )
            })
            .collect();
        self.total_touches = self.entries.values().map(|e| e.touches).sum();
        if let Some(newest) = self.entries.values().map(|e| e.last_touched).max() {
            while self.entries.len() > self.max_entries {
                let Some(victim) = self.weakest(newest) else { break };
                if let Some(removed) = self.entries.remove(&victim) {
                    self.total_touches = self.total_touches.saturating_sub(removed.touches);
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn score_entry(&self, entry: &Entry, now: DateTime<Utc>) -> f64 {
        let age_hours = ((now - entry.last_touched).num_milliseconds().max(0)) as f64 / 3_600_000.0;
        let recency = 0.5f64.powf(age_hours / self.half_life_hours);
        let frequency = if self.total_touches == 0 {
            0.0
        } else {
            entry.touches as f64 / self.total_touches as f64
        };
        self.recency_weight * recency + self.frequency_weight * frequency
    }

    /// Lowest score, then oldest touch, then subject.
    fn weakest(&self, now: DateTime<Utc>) -> Option<String> {
        self.entries
            .iter()
            .min_by(|(sa, a), (sb, b)| {
                self.score_entry(a, now)
                    .total_cmp(&self.score_entry(b, now))
                    .then(a.last_touched.cmp(&b.last_touched))
                    .then_with(|| sa.cmp(sb))
            })
            .map(|(subject, _)| subject.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_core::EventKind;
    use chrono::Duration;

    fn cache(max: usize) -> RelevanceCache {
        RelevanceCache::new(&ContextConfig {
            max_relevant_files: max,
            ..ContextConfig::default()
        })
    }

    #[test]
    fn keeps_the_two_most_relevant() {
        let mut cache = cache(2);
        let t0 = Utc::now();
        cache.touch("a.rs", t0);
        cache.touch("b.rs", t0 + Duration::minutes(1));
        cache.touch("c.rs", t0 + Duration::minutes(2));

        assert_eq!(cache.len(), 2);
        let top = cache.top_k(2, t0 + Duration::minutes(3));
        let subjects: Vec<_> = top.iter().map(|e| e.subject.as_str()).collect();
        assert_eq!(subjects, vec!["c.rs", "b.rs"]);
    }

    #[test]
    fn frequency_raises_score() {
        let mut cache = cache(10);
        let t0 = Utc::now();
        cache.touch("hot.rs", t0);
        cache.touch("hot.rs", t0);
        cache.touch("hot.rs", t0);
        cache.touch("cold.rs", t0);
        let now = t0 + Duration::minutes(1);
        assert!(cache.score("hot.rs", now).unwrap() > cache.score("cold.rs", now).unwrap());
    }

    #[test]
    fn recency_decays_with_half_life() {
        let mut cache = cache(10);
        let t0 = Utc::now();
        cache.touch("a.rs", t0);
        let fresh = cache.score("a.rs", t0).unwrap();
        let later = cache.score("a.rs", t0 + Duration::hours(4)).unwrap();
        // One half-life halves the recency term only
        assert!((fresh - later - 0.3).abs() < 1e-9);
    }

    #[test]
    fn entries_below_threshold_are_hidden_but_kept() {
        let mut cache = RelevanceCache::new(&ContextConfig {
            relevance_threshold: 0.5,
            recency_weight: 1.0,
            frequency_weight: 0.0,
            ..ContextConfig::default()
        });
        let t0 = Utc::now();
        cache.touch("old.rs", t0);
        let now = t0 + Duration::hours(40);
        assert!(cache.top_k(5, now).is_empty());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn only_file_access_events_touch() {
        let mut cache = cache(10);
        let now = Utc::now();
        let event = |kind: EventKind, subject: &str| Event {
            id: 1,
            kind,
            subject: subject.into(),
            timestamp: now,
        };
        assert!(cache.observe(&event(EventKind::Read, "a.rs")));
        assert!(!cache.observe(&event(EventKind::Grep, "fn main")));
        assert!(!cache.observe(&event(EventKind::TodoUpdate, "todo-1")));
        assert!(!cache.observe(&event(EventKind::Edit, "  ")));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn top_k_is_capped_at_capacity() {
        let mut cache = cache(2);
        let t0 = Utc::now();
        cache.touch("a.rs", t0);
        cache.touch("b.rs", t0);
        assert_eq!(cache.top_k(50, t0).len(), 2);
    }

    #[test]
    fn restore_roundtrips_entries() {
        let mut cache = cache(5);
        let t0 = Utc::now();
        cache.touch("a.rs", t0);
        cache.touch("a.rs", t0 + Duration::minutes(1));
        cache.touch("b.rs", t0 + Duration::minutes(2));
        let now = t0 + Duration::minutes(5);

        let mut restored = RelevanceCache::new(&ContextConfig {
            max_relevant_files: 5,
            ..ContextConfig::default()
        });
        restored.restore(cache.entries(now));
        assert_eq!(restored.entries(now), cache.entries(now));
    }
}
