//! # Cadence Core
//!
//! Domain types, traits, and error definitions for the Cadence workflow
//! learning engine. This crate has **no runtime dependencies** beyond the
//! broadcast channel used by the event bus; it defines the model every other
//! crate in the workspace is built against.
//!
//! ## Design Philosophy
//!
//! Every seam is declared here and implemented elsewhere:
//! - tool-use events and their kinds ([`event`])
//! - learned patterns ([`pattern`]) and relevance entries ([`relevance`])
//! - hook bindings, dispatch outcomes and the [`Executable`] capability ([`hook`])
//! - persisted snapshots ([`snapshot`])
//! - observability events ([`bus`])

pub mod bus;
pub mod error;
pub mod event;
pub mod hook;
pub mod pattern;
pub mod profile;
pub mod relevance;
pub mod snapshot;

// Re-export key types at crate root for ergonomics
pub use bus::{DomainEvent, EventBus};
pub use error::{Error, HookError, Result, StateError};
pub use event::{Event, EventInput, EventKind};
pub use hook::{DispatchContext, DispatchOutcome, DispatchStatus, Executable, HookBinding};
pub use pattern::{Pattern, Signature};
pub use profile::ProjectProfile;
pub use relevance::RelevanceEntry;
pub use snapshot::{SNAPSHOT_FORMAT_VERSION, Snapshot};
