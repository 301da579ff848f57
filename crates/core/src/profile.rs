//! Static facts about the project, supplied by the project analyzer.

use serde::{Deserialize, Serialize};

/// Output of the project analyzer. Treated as opaque input used to tune
/// learning thresholds; Cadence never computes it itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectProfile {
    /// Static complexity score in [0, 1]
    #[serde(default)]
    pub complexity: f64,

    /// Primary languages, most used first
    #[serde(default)]
    pub languages: Vec<String>,

    #[serde(default)]
    pub has_tests: bool,

    #[serde(default)]
    pub has_ci: bool,
}

impl ProjectProfile {
    /// Complexity clamped to [0, 1]; analyzers are not trusted to stay in range.
    pub fn normalized_complexity(&self) -> f64 {
        if self.complexity.is_finite() {
            self.complexity.clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}
