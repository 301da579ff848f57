//! Next-action prediction from the learned library.

use crate::library::PatternLibrary;
use cadence_core::{EventKind, Signature};
use serde::Serialize;

/// The kind expected to follow the current tail.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub kind: EventKind,

    /// Confidence of the pattern the prediction came from
    pub confidence: f64,

    pub signature: Signature,

    /// How many trailing events matched the pattern prefix
    pub matched_len: usize,
}

/// Only patterns seen at least this often are used for prediction.
const MIN_OCCURRENCES: u64 = 2;

#[derive(Debug, Clone, Default)]
pub struct Predictor;

impl Predictor {
    pub fn new() -> Self {
        Self
    }

    /// Predict the kind that follows `tail` (oldest first).
    ///
    /// Uses the longest suffix of `tail` that is a proper prefix of some
    /// pattern and picks the best such pattern by library ranking.
    pub fn predict_next(&self, library: &PatternLibrary, tail: &[EventKind]) -> Option<Prediction> {
        let longest = library.longest_signature();
        if longest < 2 || tail.is_empty() {
            return None;
        }
        let max_suffix = tail.len().min(longest - 1);

        for len in (1..=max_suffix).rev() {
            let suffix = &tail[tail.len() - len..];
            let best = library
                .lookup(suffix)
                .into_iter()
                .find(|p| p.signature.len() > len && p.occurrences >= MIN_OCCURRENCES);
            if let Some(pattern) = best {
                return Some(Prediction {
                    kind: pattern.signature[len].clone(),
                    confidence: pattern.confidence,
                    signature: pattern.signature.clone(),
                    matched_len: len,
                });
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_config::LearningConfig;
    use cadence_core::EventKind::*;
    use chrono::Utc;

    fn library() -> PatternLibrary {
        PatternLibrary::new(&LearningConfig::default())
    }

    #[test]
    fn empty_library_predicts_nothing() {
        assert!(Predictor::new().predict_next(&library(), &[Read]).is_none());
    }

    #[test]
    fn predicts_continuation_of_pair() {
        let mut lib = library();
        lib.record(vec![Read, Edit], 3, Utc::now());
        let p = Predictor::new().predict_next(&lib, &[Grep, Read]).unwrap();
        assert_eq!(p.kind, Edit);
        assert_eq!(p.matched_len, 1);
        assert!((p.confidence - lib.get(&[Read, Edit]).unwrap().confidence).abs() < 1e-12);
    }

    #[test]
    fn single_occurrence_patterns_are_ignored() {
        let mut lib = library();
        lib.record(vec![Read, Edit], 1, Utc::now());
        assert!(Predictor::new().predict_next(&lib, &[Read]).is_none());
    }

    #[test]
    fn longest_suffix_wins() {
        let mut lib = library();
        let now = Utc::now();
        lib.record(vec![Edit, Write], 9, now);
        lib.record(vec![Read, Edit, TodoUpdate], 2, now);
        let p = Predictor::new().predict_next(&lib, &[Read, Edit]).unwrap();
        assert_eq!(p.kind, TodoUpdate);
        assert_eq!(p.matched_len, 2);
    }
}
