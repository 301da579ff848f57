//! Error types for the Cadence domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use std::path::PathBuf;
use thiserror::Error;

/// The top-level error type for all Cadence operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Hook errors ---
    #[error("Hook error: {0}")]
    Hook(#[from] HookError),

    // --- Persistence errors ---
    #[error("State error: {0}")]
    State(#[from] StateError),

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum HookError {
    #[error("Failed to launch hook {binding}: {reason}")]
    Spawn { binding: String, reason: String },

    #[error("Hook {binding} exited with code {exit_code}: {stderr}")]
    NonZeroExit {
        binding: String,
        exit_code: i32,
        stderr: String,
    },

    #[error("Hook {binding} timed out after {timeout_ms}ms")]
    Timeout { binding: String, timeout_ms: u64 },

    #[error("Hook {binding} failed: {reason}")]
    ExecutionFailed { binding: String, reason: String },

    #[error("Invalid matcher for binding {binding}: {reason}")]
    InvalidMatcher { binding: String, reason: String },
}

#[derive(Debug, Error)]
pub enum StateError {
    #[error("I/O error on {path}: {reason}")]
    Io { path: PathBuf, reason: String },

    #[error("Snapshot {path} is corrupt: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    #[error("Snapshot {path} uses format {found}, newest supported is {supported}")]
    UnsupportedVersion {
        path: PathBuf,
        found: u32,
        supported: u32,
    },

    #[error("Failed to encode snapshot: {0}")]
    Encode(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hook_error_displays_correctly() {
        let err = Error::Hook(HookError::Timeout {
            binding: "track-research".into(),
            timeout_ms: 100,
        });
        assert!(err.to_string().contains("track-research"));
        assert!(err.to_string().contains("100ms"));
    }

    #[test]
    fn state_error_displays_correctly() {
        let err = Error::State(StateError::UnsupportedVersion {
            path: PathBuf::from("/tmp/snapshot.snap"),
            found: 9,
            supported: 1,
        });
        let text = err.to_string();
        assert!(text.contains("snapshot.snap"));
        assert!(text.contains('9'));
    }
}
