//! Configuration loading, validation, and management for Cadence.
//!
//! Loads configuration from `<project>/.cadence/config.toml` (or
//! `$CADENCE_HOME/config.toml`) with environment variable overrides.
//! Validates all settings at startup; bindings are never reloaded at runtime.

use cadence_core::{HookBinding, ProjectProfile};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `.cadence/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Pattern detection, prediction and adaptation thresholds
    #[serde(default)]
    pub learning: LearningConfig,

    /// Hook dispatch limits and bindings
    #[serde(default)]
    pub hooks: HooksConfig,

    /// Relevance cache tuning
    #[serde(default)]
    pub context: ContextConfig,

    /// Snapshot persistence and retention
    #[serde(default)]
    pub state: StateConfig,
}

/// How strictly repeated subsequences must match.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sensitivity {
    /// Kind only, tolerating one foreign event inside an occurrence
    Low,
    /// Kind only
    #[default]
    Medium,
    /// Kind and subject
    High,
}

impl std::str::FromStr for Sensitivity {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Sensitivity::Low),
            "medium" => Ok(Sensitivity::Medium),
            "high" => Ok(Sensitivity::High),
            other => Err(ConfigError::ValidationError(format!(
                "detection_sensitivity must be low, medium or high (got '{other}')"
            ))),
        }
    }
}

impl std::fmt::Display for Sensitivity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Sensitivity::Low => "low",
            Sensitivity::Medium => "medium",
            Sensitivity::High => "high",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningConfig {
    /// Events considered per detection pass
    #[serde(default = "default_window")]
    pub pattern_window_size: usize,

    #[serde(default = "default_min_pattern_length")]
    pub min_pattern_length: usize,

    /// Smoothing factor applied on every occurrence
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,

    #[serde(default)]
    pub detection_sensitivity: Sensitivity,

    #[serde(default = "default_max_patterns")]
    pub max_patterns: usize,

    /// Patterns unseen for this long are pruned
    #[serde(default = "default_cleanup_days")]
    pub cleanup_days: u32,

    /// Minimum prediction confidence before any hook fires
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,

    /// Hard ceiling on events held in memory
    #[serde(default = "default_event_log_capacity")]
    pub event_log_capacity: usize,

    /// Silence tolerated before confidence starts decaying
    #[serde(default = "default_decay_grace_hours")]
    pub decay_grace_hours: f64,

    #[serde(default = "default_decay_half_life_hours")]
    pub decay_half_life_hours: f64,

    /// How often pruning and decay run
    #[serde(default = "default_maintenance_interval_minutes")]
    pub maintenance_interval_minutes: u64,
}

fn default_window() -> usize {
    20
}
fn default_min_pattern_length() -> usize {
    2
}
fn default_learning_rate() -> f64 {
    0.2
}
fn default_max_patterns() -> usize {
    500
}
fn default_cleanup_days() -> u32 {
    30
}
fn default_confidence_threshold() -> f64 {
    0.7
}
fn default_event_log_capacity() -> usize {
    1024
}
fn default_decay_grace_hours() -> f64 {
    24.0
}
fn default_decay_half_life_hours() -> f64 {
    72.0
}
fn default_maintenance_interval_minutes() -> u64 {
    60
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            pattern_window_size: default_window(),
            min_pattern_length: default_min_pattern_length(),
            learning_rate: default_learning_rate(),
            detection_sensitivity: Sensitivity::default(),
            max_patterns: default_max_patterns(),
            cleanup_days: default_cleanup_days(),
            confidence_threshold: default_confidence_threshold(),
            event_log_capacity: default_event_log_capacity(),
            decay_grace_hours: default_decay_grace_hours(),
            decay_half_life_hours: default_decay_half_life_hours(),
            maintenance_interval_minutes: default_maintenance_interval_minutes(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HooksConfig {
    /// Hook executions allowed to run at once
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    #[serde(default = "default_timeout_ms")]
    pub default_timeout_ms: u64,

    /// Pending requests held before the oldest is skipped
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Time in-flight hooks get to finish at shutdown
    #[serde(default = "default_shutdown_grace_ms")]
    pub shutdown_grace_ms: u64,

    /// Outcomes kept for inspection
    #[serde(default = "default_outcome_history")]
    pub outcome_history: usize,

    /// Working directory for hook commands (defaults to the current directory)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_root: Option<PathBuf>,

    #[serde(default)]
    pub bindings: Vec<HookBinding>,
}

fn default_max_concurrent() -> usize {
    4
}
fn default_timeout_ms() -> u64 {
    30_000
}
fn default_queue_capacity() -> usize {
    64
}
fn default_shutdown_grace_ms() -> u64 {
    5_000
}
fn default_outcome_history() -> usize {
    256
}

impl Default for HooksConfig {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
            default_timeout_ms: default_timeout_ms(),
            queue_capacity: default_queue_capacity(),
            shutdown_grace_ms: default_shutdown_grace_ms(),
            outcome_history: default_outcome_history(),
            project_root: None,
            bindings: vec![],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    #[serde(default = "default_max_relevant_files")]
    pub max_relevant_files: usize,

    /// Entries scoring below this are kept but not surfaced
    #[serde(default = "default_relevance_threshold")]
    pub relevance_threshold: f64,

    #[serde(default = "default_recency_weight")]
    pub recency_weight: f64,

    #[serde(default = "default_frequency_weight")]
    pub frequency_weight: f64,

    /// Half-life of the recency term
    #[serde(default = "default_half_life_hours")]
    pub half_life_hours: f64,
}

fn default_max_relevant_files() -> usize {
    20
}
fn default_relevance_threshold() -> f64 {
    0.1
}
fn default_recency_weight() -> f64 {
    0.6
}
fn default_frequency_weight() -> f64 {
    0.4
}
fn default_half_life_hours() -> f64 {
    4.0
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_relevant_files: default_max_relevant_files(),
            relevance_threshold: default_relevance_threshold(),
            recency_weight: default_recency_weight(),
            frequency_weight: default_frequency_weight(),
            half_life_hours: default_half_life_hours(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateConfig {
    /// Snapshot directory (defaults to `<config dir>/state`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,

    /// Hours between periodic snapshots
    #[serde(default = "default_interval_hours")]
    pub interval_hours: f64,

    #[serde(default = "default_retention_days")]
    pub retention_days: u32,

    #[serde(default = "default_max_snapshots")]
    pub max_snapshots: usize,

    /// zstd-compress snapshot payloads
    #[serde(default = "default_true")]
    pub compress: bool,
}

fn default_interval_hours() -> f64 {
    1.0
}
fn default_retention_days() -> u32 {
    30
}
fn default_max_snapshots() -> usize {
    10
}
fn default_true() -> bool {
    true
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            dir: None,
            interval_hours: default_interval_hours(),
            retention_days: default_retention_days(),
            max_snapshots: default_max_snapshots(),
            compress: true,
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (`.cadence/config.toml`).
    ///
    /// Environment variables override file values:
    /// - `CADENCE_CONFIDENCE_THRESHOLD`
    /// - `CADENCE_MAX_CONCURRENT`
    /// - `CADENCE_SENSITIVITY`
    /// - `CADENCE_STATE_DIR`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from a variable lookup (the process environment in `load`).
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("CADENCE_CONFIDENCE_THRESHOLD") {
            self.learning.confidence_threshold = v.trim().parse().map_err(|_| {
                ConfigError::ValidationError(format!("CADENCE_CONFIDENCE_THRESHOLD is not a number: {v}"))
            })?;
        }
        if let Some(v) = lookup("CADENCE_MAX_CONCURRENT") {
            self.hooks.max_concurrent = v.trim().parse().map_err(|_| {
                ConfigError::ValidationError(format!("CADENCE_MAX_CONCURRENT is not an integer: {v}"))
            })?;
        }
        if let Some(v) = lookup("CADENCE_SENSITIVITY") {
            self.learning.detection_sensitivity = v.parse()?;
        }
        if let Some(v) = lookup("CADENCE_STATE_DIR") {
            self.state.dir = Some(PathBuf::from(v));
        }
        self.validate()
    }

    /// Tune thresholds for the analysed project.
    ///
    /// Complex projects get a wider detection window, a larger relevance cache
    /// and a slightly stricter dispatch threshold.
    pub fn apply_profile(&mut self, profile: &ProjectProfile) -> Result<(), ConfigError> {
        let c = profile.normalized_complexity();
        let scale = 1.0 + c;

        self.learning.pattern_window_size =
            ((self.learning.pattern_window_size as f64) * scale).round() as usize;
        self.context.max_relevant_files =
            ((self.context.max_relevant_files as f64) * scale).round() as usize;
        self.learning.confidence_threshold =
            (self.learning.confidence_threshold + 0.1 * c).min(0.95);

        tracing::debug!(
            complexity = c,
            window = self.learning.pattern_window_size,
            threshold = self.learning.confidence_threshold,
            "Applied project profile"
        );
        self.validate()
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        match std::env::var("CADENCE_HOME") {
            Ok(home) if !home.is_empty() => PathBuf::from(home),
            _ => std::env::current_dir()
                .unwrap_or_else(|_| PathBuf::from("."))
                .join(".cadence"),
        }
    }

    /// Directory where snapshots are written.
    pub fn state_dir(&self) -> PathBuf {
        self.state
            .dir
            .clone()
            .unwrap_or_else(|| Self::config_dir().join("state"))
    }

    /// Working directory handed to hook commands.
    pub fn project_root(&self) -> PathBuf {
        self.hooks
            .project_root
            .clone()
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let l = &self.learning;
        if l.min_pattern_length < 2 {
            return Err(ConfigError::ValidationError(
                "min_pattern_length must be at least 2".into(),
            ));
        }
        if l.pattern_window_size < 2 * l.min_pattern_length {
            return Err(ConfigError::ValidationError(format!(
                "pattern_window_size ({}) must hold two occurrences of min_pattern_length ({})",
                l.pattern_window_size, l.min_pattern_length
            )));
        }
        if l.event_log_capacity < l.pattern_window_size {
            return Err(ConfigError::ValidationError(
                "event_log_capacity must be >= pattern_window_size".into(),
            ));
        }
        if !(l.learning_rate > 0.0 && l.learning_rate <= 1.0) {
            return Err(ConfigError::ValidationError(
                "learning_rate must be in (0, 1]".into(),
            ));
        }
        if !(0.0..=1.0).contains(&l.confidence_threshold) {
            return Err(ConfigError::ValidationError(
                "confidence_threshold must be between 0.0 and 1.0".into(),
            ));
        }
        if l.max_patterns == 0 {
            return Err(ConfigError::ValidationError("max_patterns must be > 0".into()));
        }
        if !(l.decay_half_life_hours > 0.0) || !(l.decay_grace_hours >= 0.0) {
            return Err(ConfigError::ValidationError(
                "decay_half_life_hours must be > 0 and decay_grace_hours >= 0".into(),
            ));
        }
        if l.maintenance_interval_minutes == 0 {
            return Err(ConfigError::ValidationError(
                "maintenance_interval_minutes must be > 0".into(),
            ));
        }

        let h = &self.hooks;
        if h.max_concurrent == 0 || h.queue_capacity == 0 {
            return Err(ConfigError::ValidationError(
                "max_concurrent and queue_capacity must be > 0".into(),
            ));
        }
        if h.default_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "default_timeout_ms must be > 0".into(),
            ));
        }
        let mut seen = HashSet::new();
        for binding in &h.bindings {
            if binding.id.trim().is_empty() {
                return Err(ConfigError::ValidationError("binding id must not be empty".into()));
            }
            if !seen.insert(binding.id.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "duplicate binding id '{}'",
                    binding.id
                )));
            }
            if binding.command.trim().is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "binding '{}' has an empty command",
                    binding.id
                )));
            }
            if let Err(e) = regex_lite::Regex::new(&binding.matcher) {
                return Err(ConfigError::ValidationError(format!(
                    "binding '{}' has an invalid matcher: {e}",
                    binding.id
                )));
            }
        }

        let c = &self.context;
        if c.max_relevant_files == 0 {
            return Err(ConfigError::ValidationError(
                "max_relevant_files must be > 0".into(),
            ));
        }
        if !(c.recency_weight >= 0.0) || !(c.frequency_weight >= 0.0) {
            return Err(ConfigError::ValidationError(
                "relevance weights must be non-negative".into(),
            ));
        }
        if !(c.recency_weight + c.frequency_weight > 0.0) {
            return Err(ConfigError::ValidationError(
                "recency_weight + frequency_weight must be > 0".into(),
            ));
        }
        if !(c.half_life_hours > 0.0) {
            return Err(ConfigError::ValidationError("half_life_hours must be > 0".into()));
        }
        if !(c.relevance_threshold >= 0.0 && c.relevance_threshold.is_finite()) {
            return Err(ConfigError::ValidationError(
                "relevance_threshold must be a finite value >= 0".into(),
            ));
        }

        let s = &self.state;
        if !(s.interval_hours > 0.0) {
            return Err(ConfigError::ValidationError("interval_hours must be > 0".into()));
        }
        if s.max_snapshots == 0 {
            return Err(ConfigError::ValidationError("max_snapshots must be > 0".into()));
        }

        Ok(())
    }

    /// Config with the starter bindings written by `cadence init`.
    pub fn starter() -> Self {
        let mut config = Self::default();
        config.hooks.bindings = default_bindings();
        config
    }

    /// Generate the starter config TOML string (for the `init` command).
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Self::starter()).unwrap_or_default()
    }
}

/// Bindings installed by `cadence init`.
pub fn default_bindings() -> Vec<HookBinding> {
    vec![
        HookBinding {
            id: "track-research".into(),
            matcher: "Read|Grep".into(),
            command: "{project_root}/.cadence/hooks/track-research.sh {subject}".into(),
            timeout_ms: None,
            enabled: true,
            description: "Track research activities".into(),
        },
        HookBinding {
            id: "track-implementation".into(),
            matcher: "Write|Edit|MultiEdit".into(),
            command: "{project_root}/.cadence/hooks/track-implementation.sh {subject}".into(),
            timeout_ms: None,
            enabled: true,
            description: "Track implementation progress".into(),
        },
        HookBinding {
            id: "update-memory".into(),
            matcher: "TodoUpdate".into(),
            command: "{project_root}/.cadence/hooks/update-memory.sh --from-todos".into(),
            timeout_ms: Some(10_000),
            enabled: true,
            description: "Update project memory from todos".into(),
        },
    ]
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
