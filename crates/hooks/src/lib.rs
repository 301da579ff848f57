//! Hook execution for Cadence.
//!
//! Bindings from configuration are compiled into a [`HookRegistry`]; the
//! [`HookDispatcher`] runs matched hooks on a bounded worker pool with
//! per-hook deadlines, and outcomes are kept in an [`OutcomeLog`].

pub mod dispatcher;
pub mod executable;
pub mod outcome_log;
pub mod registry;

pub use dispatcher::{DrainReport, HookDispatcher};
pub use executable::{CallbackExecutable, ShellExecutable};
pub use outcome_log::{OutcomeCounts, OutcomeLog};
pub use registry::{HookRegistry, HookSummary, RegisteredHook};
