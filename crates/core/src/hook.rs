//! Hook bindings and the capability used to run them.
//!
//! A binding maps an event-kind matcher to an opaque command. How the command
//! is actually executed (subprocess, in-process callback) is hidden behind
//! [`Executable`], so the dispatcher only deals in deadlines and outcomes.

use crate::event::{Event, EventKind};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::HookError;

/// A static rule mapping an event matcher to an external hook command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookBinding {
    /// Unique binding id (shown in outcomes and logs)
    pub id: String,

    /// Case-insensitive regex searched in the event-kind name, e.g. `Write|Edit`
    pub matcher: String,

    /// Command line; `{placeholders}` are substituted before execution
    pub command: String,

    /// Per-binding timeout, overriding the dispatcher default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,

    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

fn default_true() -> bool {
    true
}

impl HookBinding {
    /// The effective timeout given the dispatcher default.
    pub fn timeout_or(&self, default: Duration) -> Duration {
        self.timeout_ms.map(Duration::from_millis).unwrap_or(default)
    }
}

/// Immutable context handed to a hook. Each dispatch gets its own copy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchContext {
    /// The event that triggered the evaluation
    pub event: Event,

    /// Kind the predictor expects next
    pub predicted: EventKind,

    /// Confidence of the pattern behind the prediction
    pub confidence: f64,

    /// Signature of the pattern behind the prediction
    pub signature: Vec<EventKind>,

    /// Working directory for subprocess hooks
    pub project_root: String,
}

/// Terminal status of a dispatch request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchStatus {
    Success,
    Failure,
    TimedOut,
    Skipped,
}

impl std::fmt::Display for DispatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DispatchStatus::Success => "success",
            DispatchStatus::Failure => "failure",
            DispatchStatus::TimedOut => "timed_out",
            DispatchStatus::Skipped => "skipped",
        };
        f.write_str(s)
    }
}

/// Recorded result of one accepted dispatch request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchOutcome {
    pub request_id: u64,
    pub binding_id: String,
    pub started_at: DateTime<Utc>,

    /// Wall-clock execution time in milliseconds (0 when skipped)
    pub duration_ms: u64,

    pub status: DispatchStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,

    /// Trimmed output of the hook, when it produced any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

impl DispatchOutcome {
    /// Outcome for a request that never ran.
    pub fn skipped(request_id: u64, binding_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            request_id,
            binding_id: binding_id.into(),
            started_at: Utc::now(),
            duration_ms: 0,
            status: DispatchStatus::Skipped,
            error_detail: Some(reason.into()),
            output: None,
        }
    }
}

/// A runnable hook.
///
/// Implementations should honour `timeout` themselves where they can (e.g. by
/// killing a child process); the dispatcher additionally enforces it by
/// dropping the returned future, so implementations must be cancel-safe.
#[async_trait]
pub trait Executable: Send + Sync {
    /// Short description used in logs.
    fn describe(&self) -> String;

    /// Run the hook. `Ok` carries the hook's output.
    async fn run(&self, context: &DispatchContext, timeout: Duration) -> Result<String, HookError>;
}
