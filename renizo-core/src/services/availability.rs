//! Storage availability - decided once, at construction
//!
//! The host either has durable storage or it does not (headless renders,
//! read-only sandboxes, `storageBackend: "none"`). That question is answered
//! here a single time; everything downstream receives a store that works, or
//! a [`NoopStorage`] that silently stores nothing.

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::adapters::duckdb::DB_FILE;
use crate::adapters::{DuckDbStorage, JsonFileStorage, MemoryStorage, NoopStorage};
use crate::domain::result::Error;
use crate::ports::KeyValueStorage;

/// Which storage adapter to attach
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Json,
    DuckDb,
    Memory,
    None,
}

impl StorageBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageBackend::Json => "json",
            StorageBackend::DuckDb => "duckdb",
            StorageBackend::Memory => "memory",
            StorageBackend::None => "none",
        }
    }
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StorageBackend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "json" | "file" => Ok(StorageBackend::Json),
            "duckdb" => Ok(StorageBackend::DuckDb),
            "memory" => Ok(StorageBackend::Memory),
            "none" | "off" => Ok(StorageBackend::None),
            other => Err(Error::Config(format!(
                "Unknown storage backend '{}'. Available: json, duckdb, memory, none",
                other
            ))),
        }
    }
}

/// Outcome of probing the host for durable storage
pub enum StorageAvailability {
    Available(Arc<dyn KeyValueStorage>),
    Unavailable { reason: String },
}

impl StorageAvailability {
    /// Try to open `backend` inside `data_dir`.
    ///
    /// Failures do not propagate: they yield `Unavailable` with the reason.
    pub fn probe(backend: StorageBackend, data_dir: &Path) -> Self {
        let opened: Result<Arc<dyn KeyValueStorage>, Error> = match backend {
            StorageBackend::Json => {
                JsonFileStorage::open(data_dir).map(|s| Arc::new(s) as Arc<dyn KeyValueStorage>)
            }
            StorageBackend::DuckDb => DuckDbStorage::open(&data_dir.join(DB_FILE))
                .map(|s| Arc::new(s) as Arc<dyn KeyValueStorage>),
            StorageBackend::Memory => Ok(Arc::new(MemoryStorage::new())),
            StorageBackend::None => {
                return Self::Unavailable {
                    reason: "persistent storage disabled".to_string(),
                }
            }
        };

        match opened {
            Ok(storage) => {
                debug!("Attached {} storage in {}", backend, data_dir.display());
                Self::Available(storage)
            }
            Err(e) => {
                warn!("{} storage unavailable, nothing will be persisted: {}", backend, e);
                Self::Unavailable {
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Wrap an already constructed store
    pub fn from_storage(storage: Arc<dyn KeyValueStorage>) -> Self {
        Self::Available(storage)
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available(_))
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Available(_) => None,
            Self::Unavailable { reason } => Some(reason),
        }
    }

    /// The working store, or the no-op stub
    pub fn into_storage(self) -> Arc<dyn KeyValueStorage> {
        match self {
            Self::Available(storage) => storage,
            Self::Unavailable { .. } => Arc::new(NoopStorage),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_backend_parsing() {
        assert_eq!("json".parse::<StorageBackend>().unwrap(), StorageBackend::Json);
        assert_eq!("DuckDB".parse::<StorageBackend>().unwrap(), StorageBackend::DuckDb);
        assert_eq!("off".parse::<StorageBackend>().unwrap(), StorageBackend::None);
        assert!("redis".parse::<StorageBackend>().is_err());
    }

    #[test]
    fn test_probe_json_is_available() {
        let dir = tempdir().unwrap();
        let availability = StorageAvailability::probe(StorageBackend::Json, dir.path());
        assert!(availability.is_available());
        assert_eq!(availability.into_storage().backend_name(), "json");
    }

    #[test]
    fn test_probe_none_degrades_to_noop() {
        let dir = tempdir().unwrap();
        let availability = StorageAvailability::probe(StorageBackend::None, dir.path());
        assert!(!availability.is_available());
        assert!(availability.reason().is_some());

        let storage = availability.into_storage();
        assert_eq!(storage.backend_name(), "none");
        storage.set("k", "v").unwrap();
        assert_eq!(storage.get("k").unwrap(), None);
    }

    #[test]
    fn test_probe_unusable_dir_degrades() {
        let dir = tempdir().unwrap();
        // A regular file where the data directory should be
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "x").unwrap();

        let availability = StorageAvailability::probe(StorageBackend::Json, &blocker);
        assert!(!availability.is_available());
        assert_eq!(availability.into_storage().backend_name(), "none");
    }
}
