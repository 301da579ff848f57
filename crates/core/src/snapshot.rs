//! Point-in-time copy of learned state.

use crate::pattern::Pattern;
use crate::relevance::RelevanceEntry;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Newest snapshot layout this build writes. Readers accept anything up to it.
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

/// Learned state captured for persistence. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default = "default_format_version")]
    pub format_version: u32,

    pub id: String,

    pub taken_at: DateTime<Utc>,

    #[serde(default)]
    pub patterns: Vec<Pattern>,

    #[serde(default)]
    pub relevance: Vec<RelevanceEntry>,
}

fn default_format_version() -> u32 {
    SNAPSHOT_FORMAT_VERSION
}

impl Snapshot {
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty() && self.relevance.is_empty()
    }
}
