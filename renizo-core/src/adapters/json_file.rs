//! JSON file storage
//!
//! All keys live in one flat `storage.json` object. Every read goes back to
//! disk, so separate handles (other processes, other open views) observe each
//! other's writes without any notification channel.
//!
//! Writers take an exclusive advisory lock on `storage.lock`, rewrite the
//! whole map into a temp file in the same directory and rename it over the
//! original. Readers therefore never see a torn file, and concurrent writers
//! resolve last-write-wins.

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use tempfile::NamedTempFile;
use tracing::warn;

use crate::domain::result::{Error, Result};
use crate::ports::KeyValueStorage;

pub const STORAGE_FILE: &str = "storage.json";
const LOCK_FILE: &str = "storage.lock";

type Entries = BTreeMap<String, String>;

#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    dir: PathBuf,
    path: PathBuf,
    lock_path: PathBuf,
}

impl JsonFileStorage {
    /// Open (or create) the storage inside `dir`.
    ///
    /// Fails when the directory cannot be created or the lock file cannot be
    /// opened, i.e. when the host has no usable persistent storage.
    pub fn open(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)?;
        let storage = Self {
            dir: dir.to_path_buf(),
            path: dir.join(STORAGE_FILE),
            lock_path: dir.join(LOCK_FILE),
        };
        storage.open_lock_file()?;
        Ok(storage)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open_lock_file(&self) -> Result<File> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.lock_path)?;
        Ok(file)
    }

    fn with_lock<T>(&self, exclusive: bool, f: impl FnOnce() -> Result<T>) -> Result<T> {
        let lock = self.open_lock_file()?;
        if exclusive {
            FileExt::lock_exclusive(&lock)?;
        } else {
            FileExt::lock_shared(&lock)?;
        }
        let result = f();
        if let Err(e) = FileExt::unlock(&lock) {
            warn!("Failed to release {}: {}", self.lock_path.display(), e);
        }
        result
    }

    fn read_entries(&self) -> Result<Entries> {
        if !self.path.exists() {
            return Ok(Entries::new());
        }
        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(Entries::new());
        }
        match serde_json::from_str(&content) {
            Ok(entries) => Ok(entries),
            Err(e) => {
                // Unreadable contents are treated as "nothing stored"; the next
                // write replaces the file.
                warn!("Ignoring corrupt {}: {}", self.path.display(), e);
                Ok(Entries::new())
            }
        }
    }

    fn write_entries(&self, entries: &Entries) -> Result<()> {
        let temp = NamedTempFile::new_in(&self.dir)?;
        {
            let mut writer = BufWriter::new(temp.as_file());
            serde_json::to_writer_pretty(&mut writer, entries)?;
            writer.flush()?;
        }
        temp.as_file().sync_all()?;
        temp.persist(&self.path)
            .map_err(|e| Error::Io(e.error))?;
        Ok(())
    }
}

impl KeyValueStorage for JsonFileStorage {
    fn backend_name(&self) -> &str {
        "json"
    }

    fn get(&self, key: &str) -> Result<Option<String>> {
        self.with_lock(false, || Ok(self.read_entries()?.remove(key)))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.with_lock(true, || {
            let mut entries = self.read_entries()?;
            entries.insert(key.to_string(), value.to_string());
            self.write_entries(&entries)
        })
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.with_lock(true, || {
            let mut entries = self.read_entries()?;
            if entries.remove(key).is_some() {
                self.write_entries(&entries)?;
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_round_trip_and_overwrite() {
        let dir = tempdir().unwrap();
        let storage = JsonFileStorage::open(dir.path()).unwrap();

        assert_eq!(storage.get("k").unwrap(), None);
        storage.set("k", "a").unwrap();
        storage.set("k", "b").unwrap();
        assert_eq!(storage.get("k").unwrap(), Some("b".to_string()));

        let content = fs::read_to_string(storage.path()).unwrap();
        let parsed: Entries = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed.get("k").map(String::as_str), Some("b"));
    }

    #[test]
    fn test_remove_is_idempotent() {
        let dir = tempdir().unwrap();
        let storage = JsonFileStorage::open(dir.path()).unwrap();

        storage.remove("missing").unwrap();
        assert!(!storage.path().exists());

        storage.set("k", "v").unwrap();
        storage.remove("k").unwrap();
        storage.remove("k").unwrap();
        assert_eq!(storage.get("k").unwrap(), None);
    }

    #[test]
    fn test_survives_reopen() {
        let dir = tempdir().unwrap();
        {
            let storage = JsonFileStorage::open(dir.path()).unwrap();
            storage.set("k", "v").unwrap();
        }
        let reopened = JsonFileStorage::open(dir.path()).unwrap();
        assert_eq!(reopened.get("k").unwrap(), Some("v".to_string()));
    }

    #[test]
    fn test_corrupt_file_reads_as_empty() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(STORAGE_FILE), "{not json").unwrap();

        let storage = JsonFileStorage::open(dir.path()).unwrap();
        assert_eq!(storage.get("k").unwrap(), None);

        storage.set("k", "v").unwrap();
        assert_eq!(storage.get("k").unwrap(), Some("v".to_string()));
    }

    #[test]
    fn test_other_keys_are_preserved() {
        let dir = tempdir().unwrap();
        let storage = JsonFileStorage::open(dir.path()).unwrap();

        storage.set("a", "1").unwrap();
        storage.set("b", "2").unwrap();
        storage.remove("a").unwrap();
        assert_eq!(storage.get("b").unwrap(), Some("2".to_string()));
    }
}
