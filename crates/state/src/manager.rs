//! Snapshot lifecycle: capture, persist, restore and retention.

use crate::store::{SnapshotFile, SnapshotStore};
use cadence_config::StateConfig;
use cadence_core::{Pattern, RelevanceEntry, SNAPSHOT_FORMAT_VERSION, Snapshot, StateError};
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use tracing::{info, warn};
use uuid::Uuid;

pub struct StateManager {
    store: SnapshotStore,
    retention_days: u32,
    max_snapshots: usize,
}

impl StateManager {
    pub fn new(config: &StateConfig, dir: PathBuf) -> Self {
        Self {
            store: SnapshotStore::new(dir, config.compress),
            retention_days: config.retention_days,
            max_snapshots: config.max_snapshots.max(1),
        }
    }

    /// Build a snapshot from copies of the learned state.
    pub fn capture(
        patterns: Vec<Pattern>,
        relevance: Vec<RelevanceEntry>,
        now: DateTime<Utc>,
    ) -> Snapshot {
        Snapshot {
            format_version: SNAPSHOT_FORMAT_VERSION,
            id: Uuid::new_v4().simple().to_string(),
            taken_at: now,
            patterns,
            relevance,
        }
    }

    pub fn persist(&self, snapshot: &Snapshot) -> Result<SnapshotFile, StateError> {
        let file = self.store.write(snapshot)?;
        info!(
            path = %file.path.display(),
            patterns = snapshot.patterns.len(),
            relevance = snapshot.relevance.len(),
            "Snapshot persisted"
        );
        Ok(file)
    }

    /// The newest snapshot, or `None` for a cold start.
    ///
    /// An unreadable or corrupt newest snapshot is a cold start, not an error.
    pub fn restore_latest(&self) -> Option<Snapshot> {
        let latest = match self.store.latest() {
            Ok(Some(file)) => file,
            Ok(None) => {
                info!(dir = %self.store.dir().display(), "No snapshot found, starting cold");
                return None;
            }
            Err(e) => {
                warn!(error = %e, "Cannot list snapshots, starting cold");
                return None;
            }
        };

        match self.store.read(&latest.path) {
            Ok(snapshot) => {
                info!(
                    path = %latest.path.display(),
                    patterns = snapshot.patterns.len(),
                    relevance = snapshot.relevance.len(),
                    "Snapshot restored"
                );
                Some(snapshot)
            }
            Err(e) => {
                warn!(error = %e, "Newest snapshot unusable, starting cold");
                None
            }
        }
    }

    /// Apply the configured retention policy.
    pub fn enforce_retention(&self, now: DateTime<Utc>) -> Result<Vec<SnapshotFile>, StateError> {
        let deleted = self
            .store
            .enforce_retention(now, self.retention_days, self.max_snapshots)?;
        if !deleted.is_empty() {
            info!(deleted = deleted.len(), "Old snapshots removed");
        }
        Ok(deleted)
    }

    pub fn snapshots(&self) -> Result<Vec<SnapshotFile>, StateError> {
        self.store.list()
    }

    pub fn read(&self, file: &SnapshotFile) -> Result<Snapshot, StateError> {
        self.store.read(&file.path)
    }

    pub fn dir(&self) -> &std::path::Path {
        self.store.dir()
    }
}
