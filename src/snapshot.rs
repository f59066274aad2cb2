//! JSON snapshot files shared by the document store and the account store.
//!
//! Callers serialise under their own write guard and take a sequence number
//! there, so a later commit always carries a larger number. Files are replaced
//! with write-then-rename and an older snapshot never lands over a newer one.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use serde::de::DeserializeOwned;
use serde::Serialize;

#[derive(thiserror::Error, Debug)]
pub enum SnapshotError {
    #[error("cannot read snapshot {path}: {source}")]
    Read { path: PathBuf, source: std::io::Error },
    #[error("snapshot {path} is not valid JSON: {source}")]
    Corrupt { path: PathBuf, source: serde_json::Error },
    #[error("cannot serialise snapshot: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Reads `path`. A missing file yields `T::default()`; anything unreadable is
/// an error so a damaged file is never silently replaced.
pub fn load<T: DeserializeOwned + Default>(path: &Path) -> Result<T, SnapshotError> {
    match std::fs::read(path) {
        Ok(bytes) => {
            let value = serde_json::from_slice(&bytes)
                .map_err(|source| SnapshotError::Corrupt { path: path.to_path_buf(), source })?;
            tracing::info!(path = %path.display(), "loaded snapshot");
            Ok(value)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::info!(path = %path.display(), "no snapshot, starting empty");
            Ok(T::default())
        }
        Err(source) => Err(SnapshotError::Read { path: path.to_path_buf(), source }),
    }
}

/// A serialised state tagged with its commit order.
pub struct Staged {
    seq: u64,
    bytes: Vec<u8>,
}

#[derive(Debug)]
pub struct SnapshotWriter {
    path: PathBuf,
    next_seq: AtomicU64,
    written: Mutex<u64>,
}

impl SnapshotWriter {
    pub fn new(path: PathBuf) -> Self {
        Self { path, next_seq: AtomicU64::new(0), written: Mutex::new(0) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Must be called while the caller still holds its write guard.
    pub fn stage<T: Serialize>(&self, state: &T) -> Result<Staged, SnapshotError> {
        let bytes = serde_json::to_vec_pretty(state)?;
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Staged { seq, bytes })
    }

    /// Writes `staged` unless a newer snapshot is already on disk. Failures are
    /// logged; the in-memory state stays authoritative.
    pub fn store(&self, staged: Staged) {
        let mut written = match self.written.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        if staged.seq <= *written {
            tracing::debug!(seq = staged.seq, latest = *written, "skipping stale snapshot");
            return;
        }
        match self.replace(&staged.bytes) {
            Ok(()) => *written = staged.seq,
            Err(e) => tracing::error!(path = %self.path.display(), error = %e, "failed to write snapshot"),
        }
    }

    fn replace(&self, bytes: &[u8]) -> std::io::Result<()> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        let mut file = std::fs::File::create(&tmp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        drop(file);
        std::fs::rename(&tmp, &self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn stale_stage_never_overwrites_newer() {
        let dir = tempfile::tempdir().unwrap();
        let writer = SnapshotWriter::new(dir.path().join("s.json"));
        let old = writer.stage(&BTreeMap::from([("a", 1)])).unwrap();
        let new = writer.stage(&BTreeMap::from([("a", 2)])).unwrap();
        writer.store(new);
        writer.store(old);
        let back: BTreeMap<String, i32> = load(writer.path()).unwrap();
        assert_eq!(back["a"], 2);
        assert!(!dir.path().join("s.json.tmp").exists());
    }

    #[test]
    fn missing_file_is_empty_and_garbage_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s.json");
        let empty: BTreeMap<String, i32> = load(&path).unwrap();
        assert!(empty.is_empty());

        std::fs::write(&path, b"{\"a\": 1").unwrap();
        assert!(matches!(load::<BTreeMap<String, i32>>(&path), Err(SnapshotError::Corrupt { .. })));
    }

    #[test]
    fn creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let writer = SnapshotWriter::new(dir.path().join("nested/deeper/s.json"));
        writer.store(writer.stage(&BTreeMap::from([("k", 7)])).unwrap());
        let back: BTreeMap<String, i32> = load(writer.path()).unwrap();
        assert_eq!(back["k"], 7);
    }
}
