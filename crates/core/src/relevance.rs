//! Scored candidates for the assistant's working context.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A project file ranked by how recently and how often it was touched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelevanceEntry {
    /// File path
    pub subject: String,

    /// Score as of the last time the entry was ranked
    pub score: f64,

    /// Number of touches since the entry was admitted
    #[serde(default)]
    pub touches: u64,

    pub last_touched: DateTime<Utc>,
}
