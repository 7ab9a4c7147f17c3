//! File-backed key-value store
//!
//! Keeps entries in a small JSON object (`session.json`) next to the rest of
//! the client's files. Writes go through a sibling lock file and an atomic
//! rename so a second process never observes a half-written cache.

use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;

use crate::domain::result::{Error, Result};
use crate::ports::KeyValueStore;

/// Default file name inside the client directory
pub const SESSION_FILE: &str = "session.json";

/// JSON file implementation of [`KeyValueStore`]
#[derive(Debug, Clone)]
pub struct FileKeyValueStore {
    path: PathBuf,
}

impl FileKeyValueStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at `<dir>/session.json`
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(SESSION_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> Result<File> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let lock_path = self.path.with_extension("lock");
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)?;
        file.lock_exclusive()
            .map_err(|e| Error::storage(format!("Failed to lock {:?}: {}", lock_path, e)))?;
        Ok(file)
    }

    fn read_entries(&self) -> Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let content = std::fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&content)
            .map_err(|e| Error::storage(format!("Corrupt session cache {:?}: {}", self.path, e)))
    }

    fn write_entries(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_string_pretty(entries)?)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn modify(&self, f: impl FnOnce(&mut BTreeMap<String, String>)) -> Result<()> {
        let lock = self.lock()?;
        let mut entries = self.read_entries()?;
        f(&mut entries);
        let result = self.write_entries(&entries);
        let _ = lock.unlock();
        result
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.read_entries()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.modify(|entries| {
            entries.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> Result<()> {
        if !self.path.exists() {
            return Ok(());
        }
        self.modify(|entries| {
            entries.remove(key);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_reads_as_empty() {
        let dir = tempdir().unwrap();
        let store = FileKeyValueStore::in_dir(dir.path());
        assert_eq!(store.get("auth_token").unwrap(), None);
        store.remove("auth_token").unwrap();
        assert!(!store.path().exists());
    }

    #[test]
    fn test_set_get_remove() {
        let dir = tempdir().unwrap();
        let store = FileKeyValueStore::in_dir(dir.path());

        store.set("auth_token", "t1").unwrap();
        store.set("user_data", "{\"id\":\"u1\"}").unwrap();
        assert_eq!(store.get("auth_token").unwrap(), Some("t1".to_string()));

        // A second handle on the same file sees the same entries
        let other = FileKeyValueStore::in_dir(dir.path());
        assert_eq!(other.get("user_data").unwrap(), Some("{\"id\":\"u1\"}".to_string()));

        store.remove("auth_token").unwrap();
        assert_eq!(other.get("auth_token").unwrap(), None);
        assert!(other.get("user_data").unwrap().is_some());
    }

    #[test]
    fn test_corrupt_file_is_storage_error() {
        let dir = tempdir().unwrap();
        let store = FileKeyValueStore::in_dir(dir.path());
        std::fs::write(store.path(), "not json").unwrap();
        assert!(matches!(store.get("auth_token"), Err(Error::Storage(_))));
    }
}
