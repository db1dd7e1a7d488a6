//! Blob Store
//!
//! Where the history lives between runs. The history only sees the [`BlobStore`] trait,
//! which maps a logical key to one opaque byte blob that is always replaced as a whole.
//!
//! [`DirStore`] keeps `<key>.json` files in a directory (the per-user config directory by
//! default) and replaces them atomically; [`MemoryStore`] is for tests and for runs
//! without a usable directory.
//!

use directories::ProjectDirs;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// directory name under the platform config directory
pub const APPLICATION_NAME: &str = "gauss-ledger";

pub trait BlobStore {
    /// the blob stored under `key`, [`StoreError::Missing`] if there is none
    fn read(&self, key: &str) -> Result<Vec<u8>, StoreError>;
    /// replace the blob under `key`; readers see either the old or the new blob
    fn write(&self, key: &str, blob: &[u8]) -> Result<(), StoreError>;
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("nothing stored under this key")]
    Missing,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone)]
pub struct DirStore {
    dir: PathBuf,
}

impl DirStore {
    /// e.g. `~/.config/gauss-ledger` on Linux
    pub fn in_config_dir() -> Result<Self, StoreError> {
        let dirs = ProjectDirs::from("", "", APPLICATION_NAME)
            .ok_or_else(|| StoreError::Unavailable("no home directory to place the config dir in".into()))?;
        Self::open(dirs.config_dir())
    }

    /// the directory is created when missing
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn blob_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl BlobStore for DirStore {
    fn read(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        fs::read(self.blob_path(key)).map_err(|error| match error.kind() {
            std::io::ErrorKind::NotFound => StoreError::Missing,
            _ => StoreError::Io(error),
        })
    }

    fn write(&self, key: &str, blob: &[u8]) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir)?;
        // write next to the target and rename over it
        let staging = self.dir.join(format!(".{key}.json.tmp"));
        fs::write(&staging, blob)?;
        fs::rename(&staging, self.blob_path(key))?;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    blobs: RefCell<BTreeMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BlobStore for MemoryStore {
    fn read(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        self.blobs.borrow().get(key).cloned().ok_or(StoreError::Missing)
    }

    fn write(&self, key: &str, blob: &[u8]) -> Result<(), StoreError> {
        self.blobs.borrow_mut().insert(key.to_string(), blob.to_vec());
        Ok(())
    }
}

impl<S: BlobStore + ?Sized> BlobStore for &S {
    fn read(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        (**self).read(key)
    }

    fn write(&self, key: &str, blob: &[u8]) -> Result<(), StoreError> {
        (**self).write(key, blob)
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;

    #[test]
    fn store_dir_replaces_blobs() {
        // cargo test store_dir_replaces_blobs -- --nocapture
        let temp = tempfile::TempDir::new().unwrap();
        let store = DirStore::open(temp.path().join("nested")).unwrap();
        assert!(matches!(store.read("history"), Err(StoreError::Missing)));
        store.write("history", b"[1,2]").unwrap();
        assert_eq!(store.read("history").unwrap(), b"[1,2]");
        assert_eq!(store.blob_path("history"), temp.path().join("nested").join("history.json"));
        store.write("history", b"[]").unwrap();
        assert_eq!(store.read("history").unwrap(), b"[]");
        // the staging file does not linger
        let names: Vec<_> = fs::read_dir(store.dir()).unwrap().map(|entry| entry.unwrap().file_name()).collect();
        assert_eq!(names, vec![std::ffi::OsString::from("history.json")]);
    }

    #[test]
    fn store_memory_through_reference() {
        // cargo test store_memory_through_reference -- --nocapture
        let store = MemoryStore::new();
        assert!(matches!(store.read("a"), Err(StoreError::Missing)));
        store.write("a", b"x").unwrap();
        let by_ref: &dyn BlobStore = &store;
        assert_eq!(BlobStore::read(&by_ref, "a").unwrap(), b"x");
    }
}
