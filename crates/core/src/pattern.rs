//! Learned workflow patterns.

use crate::event::EventKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An ordered sequence of event kinds. Patterns are keyed by their signature.
pub type Signature = Vec<EventKind>;

/// A recurring subsequence of event kinds with its learned statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    pub signature: Signature,

    /// How many times the sequence has been observed
    pub occurrences: u64,

    pub first_seen: DateTime<Utc>,

    pub last_seen: DateTime<Utc>,

    /// Smoothed confidence, always within [0, 1]
    pub confidence: f64,

    /// Silence up to this instant has already been charged by decay
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decayed_until: Option<DateTime<Utc>>,
}

impl Pattern {
    /// A pattern that has not been reinforced yet.
    pub fn new(signature: Signature, now: DateTime<Utc>) -> Self {
        Self {
            signature,
            occurrences: 0,
            first_seen: now,
            last_seen: now,
            confidence: 0.0,
            decayed_until: None,
        }
    }

    /// Human-readable form, e.g. `Read -> Edit`.
    pub fn describe(&self) -> String {
        describe_signature(&self.signature)
    }
}

/// Render a signature as `A -> B -> C`.
pub fn describe_signature(signature: &[EventKind]) -> String {
    signature
        .iter()
        .map(EventKind::as_str)
        .collect::<Vec<_>>()
        .join(" -> ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describe_joins_kinds() {
        let p = Pattern::new(
            vec![EventKind::Read, EventKind::Edit, EventKind::from("Bash")],
            Utc::now(),
        );
        assert_eq!(p.describe(), "Read -> Edit -> Bash");
        assert_eq!(p.occurrences, 0);
        assert_eq!(p.confidence, 0.0);
    }

    #[test]
    fn older_snapshots_without_decay_cursor_load() {
        let json = r#"{"signature":["Read","Edit"],"occurrences":2,
            "first_seen":"2026-01-01T00:00:00Z","last_seen":"2026-01-01T00:00:00Z",
            "confidence":0.36}"#;
        let p: Pattern = serde_json::from_str(json).unwrap();
        assert!(p.decayed_until.is_none());
    }
}
