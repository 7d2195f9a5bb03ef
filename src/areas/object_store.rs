//! Content-addressed blob store
//!
//! Objects are stored flat, one file per hash, with no compression and no
//! hash-prefix directory sharding — both packfile-adjacent optimizations
//! this system does not need at its scale (an explicit non-goal). Writes
//! go through a temp-file-then-rename so a crash mid-write never leaves a
//! partially written object visible under its final name.

use crate::artifacts::hash::Hash;
use anyhow::Context;
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub struct ObjectStore {
    path: Box<Path>,
}

impl ObjectStore {
    pub fn new(path: Box<Path>) -> Self {
        ObjectStore { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn object_path(&self, hash: &Hash) -> PathBuf {
        self.path.join(hash.as_str())
    }

    /// Store `bytes` under their own hash. A no-op if the object already
    /// exists: content-addressing makes duplicate writes of the same hash
    /// benign.
    pub fn write(&self, bytes: &[u8]) -> anyhow::Result<Hash> {
        let hash = Hash::of(bytes);
        let object_path = self.object_path(&hash);

        if object_path.exists() {
            log::debug!("object {hash} already present, write is a no-op");
            return Ok(hash);
        }

        std::fs::create_dir_all(&self.path)
            .with_context(|| format!("unable to create object directory {}", self.path.display()))?;

        let temp_path = self.path.join(Self::temp_name());
        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)
            .with_context(|| format!("unable to open temp object file {}", temp_path.display()))?;
        file.write_all(bytes)
            .with_context(|| format!("unable to write temp object file {}", temp_path.display()))?;

        std::fs::rename(&temp_path, &object_path)
            .with_context(|| format!("unable to rename object file to {}", object_path.display()))?;

        Ok(hash)
    }

    pub fn read(&self, hash: &Hash) -> anyhow::Result<Vec<u8>> {
        let object_path = self.object_path(hash);
        std::fs::read(&object_path)
            .with_context(|| format!("unable to read object file {}", object_path.display()))
    }

    /// Unlink the blob for `hash`. Silent if it is already absent: callers
    /// only remove objects they know are no longer referenced by any
    /// persisted checkpoint.
    pub fn remove(&self, hash: &Hash) -> anyhow::Result<()> {
        let object_path = self.object_path(hash);
        match std::fs::remove_file(&object_path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("unable to remove object file {}", object_path.display())),
        }
    }

    fn temp_name() -> String {
        format!("tmp-obj-{}-{}", std::process::id(), std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.subsec_nanos())
            .unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn write_then_read_round_trips() {
        let dir = tempdir().unwrap();
        let store = ObjectStore::new(dir.path().join("objects").into_boxed_path());

        let hash = store.write(b"hello world").unwrap();
        assert_eq!(store.read(&hash).unwrap(), b"hello world");
    }

    #[test]
    fn duplicate_writes_are_idempotent() {
        let dir = tempdir().unwrap();
        let store = ObjectStore::new(dir.path().join("objects").into_boxed_path());

        let a = store.write(b"same content").unwrap();
        let b = store.write(b"same content").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn remove_is_silent_when_absent() {
        let dir = tempdir().unwrap();
        let store = ObjectStore::new(dir.path().join("objects").into_boxed_path());
        let hash = Hash::of(b"never written");
        assert!(store.remove(&hash).is_ok());
    }
}
