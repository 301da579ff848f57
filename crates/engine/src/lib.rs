//! Adaptive hook orchestration.
//!
//! The [`Runtime`] feeds every event through the learner, asks the
//! [`AdaptationEngine`] whether anything should fire, hands matching hooks to
//! the dispatcher and keeps learned state persisted.

pub mod adaptation;
pub mod runtime;

pub use adaptation::{AdaptationEngine, Decision};
pub use runtime::{IngestReport, MaintenanceReport, Runtime, RuntimeStats, ShutdownReport};
