//! Registry of configured hooks.
//!
//! Bindings are compiled once at startup; the registry is immutable while
//! the engine runs.

use crate::executable::ShellExecutable;
use cadence_core::{EventKind, Executable, HookBinding, HookError};
use regex_lite::{Regex, RegexBuilder};
use serde::Serialize;
use std::sync::Arc;

/// A binding with its compiled matcher and executable.
pub struct RegisteredHook {
    pub binding: HookBinding,
    matcher: Regex,
    pub executable: Arc<dyn Executable>,
}

impl RegisteredHook {
    pub fn new(binding: HookBinding, executable: Arc<dyn Executable>) -> Result<Self, HookError> {
        let matcher = RegexBuilder::new(&binding.matcher)
            .case_insensitive(true)
            .build()
            .map_err(|e| HookError::InvalidMatcher {
                binding: binding.id.clone(),
                reason: e.to_string(),
            })?;
        Ok(Self {
            binding,
            matcher,
            executable,
        })
    }

    /// Whether this hook is enabled and its matcher finds `kind`.
    pub fn matches(&self, kind: &EventKind) -> bool {
        self.binding.enabled && self.matcher.is_match(kind.as_str())
    }

    pub fn id(&self) -> &str {
        &self.binding.id
    }
}

impl std::fmt::Debug for RegisteredHook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredHook")
            .field("id", &self.binding.id)
            .field("matcher", &self.binding.matcher)
            .field("executable", &self.executable.describe())
            .finish()
    }
}

/// One line of `cadence hooks` output.
#[derive(Debug, Clone, Serialize)]
pub struct HookSummary {
    pub id: String,
    pub matcher: String,
    pub enabled: bool,
    pub timeout_ms: Option<u64>,
    pub executable: String,
}

/// Hooks in configuration order.
#[derive(Default)]
pub struct HookRegistry {
    hooks: Vec<Arc<RegisteredHook>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry running every binding as a shell command.
    pub fn from_bindings(bindings: &[HookBinding]) -> Result<Self, HookError> {
        let mut registry = Self::new();
        for binding in bindings {
            let executable = Arc::new(ShellExecutable::new(&binding.id, &binding.command));
            registry.register(binding.clone(), executable)?;
        }
        Ok(registry)
    }

    /// Register a hook. Replaces any existing hook with the same id.
    pub fn register(
        &mut self,
        binding: HookBinding,
        executable: Arc<dyn Executable>,
    ) -> Result<(), HookError> {
        let hook = Arc::new(RegisteredHook::new(binding, executable)?);
        match self.hooks.iter_mut().find(|h| h.id() == hook.id()) {
            Some(existing) => *existing = hook,
            None => self.hooks.push(hook),
        }
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<Arc<RegisteredHook>> {
        self.hooks.iter().find(|h| h.id() == id).cloned()
    }

    /// Enabled hooks whose matcher finds `kind`.
    pub fn matching(&self, kind: &EventKind) -> Vec<Arc<RegisteredHook>> {
        self.hooks.iter().filter(|h| h.matches(kind)).cloned().collect()
    }

    pub fn summary(&self) -> Vec<HookSummary> {
        self.hooks
            .iter()
            .map(|h| HookSummary {
                id: h.binding.id.clone(),
                matcher: h.binding.matcher.clone(),
                enabled: h.binding.enabled,
                timeout_ms: h.binding.timeout_ms,
                executable: h.executable.describe(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }
}
