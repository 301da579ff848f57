//! Persistence of learned state across sessions.
//!
//! Snapshots are written atomically with a checksummed header
//! ([`snapshot`]), kept in a directory ([`store`]) and managed by the
//! [`StateManager`], which restores the newest one at startup and applies
//! retention.

pub mod manager;
pub mod snapshot;
pub mod store;

pub use manager::StateManager;
pub use snapshot::SnapshotHeader;
pub use store::{SnapshotFile, SnapshotStore};
