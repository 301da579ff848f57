//! Snapshot file encoding.
//!
//! A snapshot file is a single JSON header line followed by the payload:
//!
//! ```text
//! {"format":1,"sha256":"<hex of payload>","compressed":true}
//! <payload: snapshot JSON, zstd-compressed when "compressed" is set>
//! ```

use cadence_core::{SNAPSHOT_FORMAT_VERSION, Snapshot, StateError};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;

const ZSTD_LEVEL: i32 = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotHeader {
    pub format: u32,

    /// Hex SHA-256 of the payload bytes as stored
    pub sha256: String,

    #[serde(default)]
    pub compressed: bool,
}

/// Encode a snapshot into file bytes.
pub fn encode(snapshot: &Snapshot, compress: bool) -> Result<Vec<u8>, StateError> {
    let json = serde_json::to_vec(snapshot).map_err(|e| StateError::Encode(e.to_string()))?;
    let payload = if compress {
        zstd::encode_all(json.as_slice(), ZSTD_LEVEL).map_err(|e| StateError::Encode(e.to_string()))?
    } else {
        json
    };

    let header = SnapshotHeader {
        format: snapshot.format_version.min(SNAPSHOT_FORMAT_VERSION),
        sha256: hex::encode(Sha256::digest(&payload)),
        compressed: compress,
    };
    let mut bytes = serde_json::to_vec(&header).map_err(|e| StateError::Encode(e.to_string()))?;
    bytes.push(b'\n');
    bytes.extend_from_slice(&payload);
    Ok(bytes)
}

/// Decode file bytes, verifying the format version and checksum.
///
/// `path` is only used for error reporting.
pub fn decode(bytes: &[u8], path: &Path) -> Result<Snapshot, StateError> {
    let corrupt = |reason: String| StateError::Corrupt {
        path: path.to_path_buf(),
        reason,
    };

    let split = bytes
        .iter()
        .position(|b| *b == b'\n')
        .ok_or_else(|| corrupt("missing header line".into()))?;
    let (header, payload) = (&bytes[..split], &bytes[split + 1..]);

    let header: SnapshotHeader =
        serde_json::from_slice(header).map_err(|e| corrupt(format!("bad header: {e}")))?;
    if header.format > SNAPSHOT_FORMAT_VERSION {
        return Err(StateError::UnsupportedVersion {
            path: path.to_path_buf(),
            found: header.format,
            supported: SNAPSHOT_FORMAT_VERSION,
        });
    }

    let digest = hex::encode(Sha256::digest(payload));
    if !digest.eq_ignore_ascii_case(&header.sha256) {
        return Err(corrupt("checksum mismatch".into()));
    }

    let json = if header.compressed {
        zstd::decode_all(payload).map_err(|e| corrupt(format!("decompression failed: {e}")))?
    } else {
        payload.to_vec()
    };

    serde_json::from_slice(&json).map_err(|e| corrupt(format!("bad payload: {e}")))
}
