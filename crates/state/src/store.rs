//! Snapshot files on disk.
//!
//! Files are named `snapshot-<millis>-<id>.snap` so lexical order is
//! chronological. Writes go to a temporary file in the same directory and are
//! renamed into place, so readers never see a partial snapshot.

use crate::snapshot;
use cadence_core::{Snapshot, StateError};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const PREFIX: &str = "snapshot-";
const SUFFIX: &str = ".snap";

/// A snapshot file found in the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotFile {
    pub path: PathBuf,
    pub taken_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
    compress: bool,
}

impl SnapshotStore {
    pub fn new(dir: impl Into<PathBuf>, compress: bool) -> Self {
        Self {
            dir: dir.into(),
            compress,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Atomically write a snapshot and return its file.
    pub fn write(&self, snapshot: &Snapshot) -> Result<SnapshotFile, StateError> {
        std::fs::create_dir_all(&self.dir).map_err(|e| io_error(&self.dir, e))?;

        let bytes = snapshot::encode(snapshot, self.compress)?;
        let millis = snapshot.taken_at.timestamp_millis().max(0);
        let short_id: String = snapshot
            .id
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .take(8)
            .collect();
        let name = format!("{PREFIX}{millis:020}-{short_id}{SUFFIX}");
        let path = self.dir.join(&name);
        let tmp = self.dir.join(format!(".{name}.tmp"));

        std::fs::write(&tmp, &bytes).map_err(|e| io_error(&tmp, e))?;
        if let Err(e) = std::fs::rename(&tmp, &path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(io_error(&path, e));
        }

        debug!(path = %path.display(), bytes = bytes.len(), "Snapshot written");
        Ok(SnapshotFile {
            path,
            taken_at: snapshot.taken_at,
        })
    }

    pub fn read(&self, path: &Path) -> Result<Snapshot, StateError> {
        let bytes = std::fs::read(path).map_err(|e| io_error(path, e))?;
        snapshot::decode(&bytes, path)
    }

    /// All snapshot files, oldest first. A missing directory means none.
    pub fn list(&self) -> Result<Vec<SnapshotFile>, StateError> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_error(&self.dir, e)),
        };

        let mut files: Vec<SnapshotFile> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let name = entry.file_name().to_string_lossy().to_string();
                let taken_at = parse_name(&name)?;
                Some(SnapshotFile {
                    path: entry.path(),
                    taken_at,
                })
            })
            .collect();
        files.sort_by(|a, b| a.taken_at.cmp(&b.taken_at).then_with(|| a.path.cmp(&b.path)));
        Ok(files)
    }

    pub fn latest(&self) -> Result<Option<SnapshotFile>, StateError> {
        Ok(self.list()?.pop())
    }

    pub fn delete(&self, file: &SnapshotFile) -> Result<(), StateError> {
        std::fs::remove_file(&file.path).map_err(|e| io_error(&file.path, e))
    }

    /// Delete snapshots older than `retention_days`, then the oldest beyond
    /// `max_snapshots`. Returns the deleted files.
    pub fn enforce_retention(
        &self,
        now: DateTime<Utc>,
        retention_days: u32,
        max_snapshots: usize,
    ) -> Result<Vec<SnapshotFile>, StateError> {
        let cutoff = now - chrono::Duration::days(retention_days as i64);
        let files = self.list()?;
        let (expired, mut kept): (Vec<_>, Vec<_>) =
            files.into_iter().partition(|f| f.taken_at < cutoff);

        let excess = kept.len().saturating_sub(max_snapshots);
        let mut doomed = expired;
        doomed.extend(kept.drain(..excess));

        let mut deleted = Vec::with_capacity(doomed.len());
        for file in doomed {
            match self.delete(&file) {
                Ok(()) => deleted.push(file),
                Err(e) => warn!(error = %e, "Failed to delete old snapshot"),
            }
        }
        Ok(deleted)
    }
}

/// Timestamp encoded in a snapshot file name.
fn parse_name(name: &str) -> Option<DateTime<Utc>> {
    let stem = name.strip_prefix(PREFIX)?.strip_suffix(SUFFIX)?;
    let millis: i64 = stem.split('-').next()?.parse().ok()?;
    DateTime::from_timestamp_millis(millis)
}

fn io_error(path: &Path, e: std::io::Error) -> StateError {
    StateError::Io {
        path: path.to_path_buf(),
        reason: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_core::SNAPSHOT_FORMAT_VERSION;
    use chrono::Duration;

    fn snapshot(id: &str, taken_at: DateTime<Utc>) -> Snapshot {
        Snapshot {
            format_version: SNAPSHOT_FORMAT_VERSION,
            id: id.into(),
            taken_at,
            patterns: vec![],
            relevance: vec![],
        }
    }

    #[test]
    fn list_is_chronological_and_ignores_strangers() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path(), true);
        let t0 = Utc::now();
        store.write(&snapshot("bbbb", t0 + Duration::seconds(5))).unwrap();
        store.write(&snapshot("aaaa", t0)).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "hi").unwrap();

        let files = store.list().unwrap();
        assert_eq!(files.len(), 2);
        assert!(files[0].taken_at < files[1].taken_at);
        let latest = store.latest().unwrap().unwrap();
        assert_eq!(store.read(&latest.path).unwrap().id, "bbbb");
    }

    #[test]
    fn missing_dir_lists_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("nope"), false);
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn no_temp_files_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path(), false);
        store.write(&snapshot("x", Utc::now())).unwrap();
        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(names.len(), 1);
        assert!(names[0].starts_with("snapshot-") && names[0].ends_with(".snap"));
    }

    #[test]
    fn retention_removes_expired_then_excess() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path(), false);
        let now = Utc::now();
        store.write(&snapshot("old", now - Duration::days(40))).unwrap();
        for i in 0..4 {
            store
                .write(&snapshot(&format!("s{i}"), now - Duration::hours(4 - i)))
                .unwrap();
        }

        let deleted = store.enforce_retention(now, 30, 2).unwrap();
        assert_eq!(deleted.len(), 3);
        let remaining = store.list().unwrap();
        assert_eq!(remaining.len(), 2);
        assert_eq!(store.read(&remaining[1].path).unwrap().id, "s3");
    }
}
