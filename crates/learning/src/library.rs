//! The set of learned patterns, keyed by signature.

use crate::confidence;
use cadence_config::LearningConfig;
use cadence_core::{Pattern, Signature};
use chrono::{DateTime, Duration, Utc};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::debug;

/// Result of reinforcing one signature.
#[derive(Debug, Clone)]
pub struct PatternUpdate {
    /// The pattern after reinforcement
    pub pattern: Pattern,

    /// Whether the signature was new to the library
    pub created: bool,

    /// Patterns removed to get back under capacity (may include `pattern`)
    pub evicted: Vec<Pattern>,
}

/// Learned patterns with capacity, staleness and decay policies.
///
/// Backed by a `BTreeMap` so iteration order, and therefore every tie-break,
/// is deterministic.
#[derive(Debug)]
pub struct PatternLibrary {
    patterns: BTreeMap<Signature, Pattern>,
    max_patterns: usize,
    learning_rate: f64,
    cleanup_after: Duration,
    decay_grace: Duration,
    decay_half_life_hours: f64,
}

impl PatternLibrary {
    pub fn new(config: &LearningConfig) -> Self {
        Self {
            patterns: BTreeMap::new(),
            max_patterns: config.max_patterns.max(1),
            learning_rate: config.learning_rate,
            cleanup_after: Duration::days(config.cleanup_days as i64),
            decay_grace: hours(config.decay_grace_hours),
            decay_half_life_hours: config.decay_half_life_hours,
        }
    }

    /// Create or reinforce a pattern once.
    pub fn update_pattern(&mut self, signature: Signature, now: DateTime<Utc>) -> PatternUpdate {
        self.record(signature, 1, now)
    }

    /// Create or reinforce a pattern `count` times in one step.
    pub fn record(&mut self, signature: Signature, count: u64, now: DateTime<Utc>) -> PatternUpdate {
        let created = !self.patterns.contains_key(&signature);
        let pattern = self
            .patterns
            .entry(signature.clone())
            .or_insert_with(|| Pattern::new(signature, now));

        pattern.occurrences += count;
        pattern.confidence = confidence::reinforce_n(pattern.confidence, self.learning_rate, count);
        if now > pattern.last_seen {
            pattern.last_seen = now;
        }
        let pattern = pattern.clone();

        debug!(
            pattern = %pattern.describe(),
            occurrences = pattern.occurrences,
            confidence = pattern.confidence,
            created,
            "Pattern reinforced"
        );

        let evicted = self.evict_if_full();
        PatternUpdate {
            pattern,
            created,
            evicted,
        }
    }

    /// Evict the weakest patterns until the library is within capacity.
    ///
    /// Weakest means lowest confidence, then oldest `last_seen`, then
    /// smallest signature.
    pub fn evict_if_full(&mut self) -> Vec<Pattern> {
        let mut evicted = Vec::new();
        while self.patterns.len() > self.max_patterns {
            let weakest = self
                .patterns
                .values()
                .min_by(|a, b| weakness(a, b))
                .map(|p| p.signature.clone());
            let Some(signature) = weakest else { break };
            if let Some(pattern) = self.patterns.remove(&signature) {
                debug!(pattern = %pattern.describe(), confidence = pattern.confidence, "Pattern evicted");
                evicted.push(pattern);
            }
        }
        evicted
    }

    /// Remove patterns not seen within the cleanup period.
    pub fn prune(&mut self, now: DateTime<Utc>) -> Vec<Pattern> {
        let cutoff = now - self.cleanup_after;
        let stale: Vec<Signature> = self
            .patterns
            .values()
            .filter(|p| p.last_seen < cutoff)
            .map(|p| p.signature.clone())
            .collect();
        stale
            .into_iter()
            .filter_map(|sig| self.patterns.remove(&sig))
            .collect()
    }

    /// Decay confidence of patterns silent for longer than the grace period.
    ///
    /// Each pattern carries its own `decayed_until` cursor, so a pass only
    /// charges silence not yet charged. Passes compose, and the cursor
    /// survives a snapshot round trip. Returns the number of patterns decayed.
    pub fn decay(&mut self, now: DateTime<Utc>) -> usize {
        let mut decayed = 0;
        for pattern in self.patterns.values_mut() {
            let grace_end = pattern.last_seen + self.decay_grace;
            if now <= grace_end {
                continue;
            }
            let since = match pattern.decayed_until {
                Some(until) if until > grace_end => until,
                _ => grace_end,
            };
            let elapsed_hours = (now - since).num_milliseconds() as f64 / 3_600_000.0;
            if elapsed_hours <= 0.0 {
                continue;
            }
            pattern.confidence =
                confidence::decay(pattern.confidence, elapsed_hours, self.decay_half_life_hours);
            pattern.decayed_until = Some(now);
            decayed += 1;
        }
        decayed
    }

    /// Patterns whose signature starts with `prefix`, best first.
    pub fn lookup(&self, prefix: &[cadence_core::EventKind]) -> Vec<&Pattern> {
        let mut found: Vec<&Pattern> = self
            .patterns
            .values()
            .filter(|p| p.signature.starts_with(prefix))
            .collect();
        found.sort_by(|a, b| rank(a, b));
        found
    }

    pub fn get(&self, signature: &[cadence_core::EventKind]) -> Option<&Pattern> {
        self.patterns.get(signature)
    }

    /// All patterns, best first.
    pub fn patterns(&self) -> Vec<Pattern> {
        self.lookup(&[]).into_iter().cloned().collect()
    }

    /// Replace the library contents wholesale.
    pub fn restore(&mut self, patterns: Vec<Pattern>) {
        self.patterns = patterns
            .into_iter()
            .map(|mut p| {
                p.confidence = if p.confidence.is_finite() {
                    p.confidence.clamp(0.0, 1.0)
                } else {
                    0.0
                };
                (p.signature.clone(), p)
            })
            .collect();
        self.evict_if_full();
    }

    /// Length of the longest stored signature.
    pub fn longest_signature(&self) -> usize {
        self.patterns.keys().map(Vec::len).max().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn max_patterns(&self) -> usize {
        self.max_patterns
    }
}

fn hours(h: f64) -> Duration {
    Duration::milliseconds((h * 3_600_000.0) as i64)
}

/// Ordering used for eviction: ascending means weaker.
fn weakness(a: &Pattern, b: &Pattern) -> Ordering {
    a.confidence
        .total_cmp(&b.confidence)
        .then(a.last_seen.cmp(&b.last_seen))
        .then_with(|| a.signature.cmp(&b.signature))
}

/// Ordering used for lookups: ascending means better.
fn rank(a: &Pattern, b: &Pattern) -> Ordering {
    b.confidence
        .total_cmp(&a.confidence)
        .then(b.occurrences.cmp(&a.occurrences))
        .then(b.last_seen.cmp(&a.last_seen))
        .then_with(|| a.signature.cmp(&b.signature))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_core::EventKind::{self, *};

    fn config(max_patterns: usize) -> LearningConfig {
        LearningConfig {
            max_patterns,
            ..LearningConfig::default()
        }
    }

    fn sig(kinds: &[EventKind]) -> Signature {
        kinds.to_vec()
    }

    #[test]
    fn update_creates_then_reinforces() {
        let mut lib = PatternLibrary::new(&config(10));
        let now = Utc::now();
        let first = lib.update_pattern(sig(&[Read, Edit]), now);
        assert!(first.created);
        assert_eq!(first.pattern.occurrences, 1);
        assert!((first.pattern.confidence - 0.2).abs() < 1e-12);

        let second = lib.update_pattern(sig(&[Read, Edit]), now + Duration::seconds(1));
        assert!(!second.created);
        assert_eq!(second.pattern.occurrences, 2);
        assert!(second.pattern.confidence > first.pattern.confidence);
        assert_eq!(second.pattern.first_seen, now);
    }

    #[test]
    fn eviction_removes_weakest() {
        let mut lib = PatternLibrary::new(&config(2));
        let now = Utc::now();
        lib.record(sig(&[Read, Edit]), 3, now);
        lib.record(sig(&[Grep, Read]), 1, now);
        let update = lib.record(sig(&[Edit, Write]), 2, now);

        assert_eq!(lib.len(), 2);
        assert_eq!(update.evicted.len(), 1);
        assert_eq!(update.evicted[0].signature, sig(&[Grep, Read]));
        let min_remaining = lib
            .patterns()
            .iter()
            .map(|p| p.confidence)
            .fold(f64::INFINITY, f64::min);
        assert!(update.evicted[0].confidence <= min_remaining);
    }

    #[test]
    fn eviction_ties_break_on_last_seen() {
        let mut lib = PatternLibrary::new(&config(1));
        let now = Utc::now();
        lib.update_pattern(sig(&[Read, Edit]), now);
        let update = lib.update_pattern(sig(&[Grep, Read]), now + Duration::seconds(5));
        assert_eq!(update.evicted[0].signature, sig(&[Read, Edit]));
        assert!(lib.get(&[Grep, Read]).is_some());
    }

    #[test]
    fn prune_drops_stale_patterns() {
        let mut lib = PatternLibrary::new(&config(10));
        let now = Utc::now();
        lib.update_pattern(sig(&[Read, Edit]), now - Duration::days(40));
        lib.update_pattern(sig(&[Grep, Read]), now - Duration::days(1));
        let pruned = lib.prune(now);
        assert_eq!(pruned.len(), 1);
        assert_eq!(pruned[0].signature, sig(&[Read, Edit]));
        assert_eq!(lib.len(), 1);
    }

    #[test]
    fn decay_respects_grace_and_composes() {
        let mut lib = PatternLibrary::new(&config(10));
        let seen = Utc::now();
        lib.record(sig(&[Read, Edit]), 5, seen);
        let before = lib.get(&[Read, Edit]).unwrap().confidence;

        // Inside the grace period nothing changes
        assert_eq!(lib.decay(seen + Duration::hours(10)), 0);
        assert_eq!(lib.get(&[Read, Edit]).unwrap().confidence, before);

        // One half-life past the grace period, split across two passes
        lib.decay(seen + Duration::hours(24 + 36));
        lib.decay(seen + Duration::hours(24 + 72));
        let after = lib.get(&[Read, Edit]).unwrap().confidence;
        assert!((after - before / 2.0).abs() < 1e-9);
    }

    #[test]
    fn decay_after_restore_matches_live_library() {
        let mut live = PatternLibrary::new(&config(10));
        let seen = Utc::now();
        live.record(sig(&[Read, Edit]), 5, seen);
        live.decay(seen + Duration::hours(48));

        let mut restored = PatternLibrary::new(&config(10));
        restored.restore(live.patterns());
        assert_eq!(restored.patterns(), live.patterns());

        live.decay(seen + Duration::hours(49));
        restored.decay(seen + Duration::hours(49));
        let a = live.get(&[Read, Edit]).unwrap().confidence;
        let b = restored.get(&[Read, Edit]).unwrap().confidence;
        assert!((a - b).abs() < 1e-12, "live {a} vs restored {b}");
    }

    #[test]
    fn lookup_orders_by_confidence_then_occurrences() {
        let mut lib = PatternLibrary::new(&config(10));
        let now = Utc::now();
        lib.record(sig(&[Read, Edit]), 2, now);
        lib.record(sig(&[Read, Grep]), 4, now);
        lib.record(sig(&[Edit, Read]), 9, now);

        let found: Vec<_> = lib.lookup(&[Read]).iter().map(|p| p.signature.clone()).collect();
        assert_eq!(found, vec![sig(&[Read, Grep]), sig(&[Read, Edit])]);
    }

    #[test]
    fn restore_replaces_contents() {
        let mut lib = PatternLibrary::new(&config(10));
        let now = Utc::now();
        lib.update_pattern(sig(&[Read, Edit]), now);
        let mut other = PatternLibrary::new(&config(10));
        other.restore(lib.patterns());
        assert_eq!(other.patterns(), lib.patterns());
    }
}
