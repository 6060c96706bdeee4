//! Configuration management
//!
//! Settings live in `<data dir>/settings.json`:
//! ```json
//! {
//!   "app": { "storageBackend": "json", "persistSession": true, "sessionTtlMinutes": 1440 }
//! }
//! ```
//! Fields this crate does not manage are preserved when saving.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::adapters::demo::DEFAULT_SESSION_TTL_MINUTES;
use crate::services::StorageBackend;

pub const SETTINGS_FILE: &str = "settings.json";

/// Env var overriding the storage backend
pub const STORAGE_ENV: &str = "RENIZO_STORAGE";

/// Env var overriding session persistence
pub const PERSIST_SESSION_ENV: &str = "RENIZO_PERSIST_SESSION";

/// Longest accepted session lifetime (one year)
pub const MAX_SESSION_TTL_MINUTES: i64 = 365 * 24 * 60;

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    app: AppSettings,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppSettings {
    #[serde(default)]
    storage_backend: StorageBackend,
    #[serde(default = "default_true")]
    persist_session: bool,
    #[serde(default = "default_ttl_minutes")]
    session_ttl_minutes: i64,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            storage_backend: StorageBackend::default(),
            persist_session: true,
            session_ttl_minutes: DEFAULT_SESSION_TTL_MINUTES,
            other: HashMap::new(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_ttl_minutes() -> i64 {
    DEFAULT_SESSION_TTL_MINUTES
}

/// Renizo configuration (simplified view of settings)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub storage_backend: StorageBackend,
    pub persist_session: bool,
    pub session_ttl_minutes: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage_backend: StorageBackend::default(),
            persist_session: true,
            session_ttl_minutes: DEFAULT_SESSION_TTL_MINUTES,
        }
    }
}

impl Config {
    /// Load config from the data directory
    ///
    /// Env overrides (for CI/testing and headless hosts):
    /// - `RENIZO_STORAGE`: json | duckdb | memory | none
    /// - `RENIZO_PERSIST_SESSION`: true/false
    pub fn load(data_dir: &Path) -> Result<Self> {
        let raw = read_settings(data_dir)?;

        let storage_backend = match std::env::var(STORAGE_ENV).ok() {
            Some(value) => match value.parse::<StorageBackend>() {
                Ok(backend) => backend,
                Err(e) => {
                    warn!("Ignoring {}: {}", STORAGE_ENV, e);
                    raw.app.storage_backend
                }
            },
            None => raw.app.storage_backend,
        };

        let persist_session = match std::env::var(PERSIST_SESSION_ENV).ok().as_deref() {
            Some("true" | "1" | "yes" | "TRUE" | "YES") => true,
            Some("false" | "0" | "no" | "FALSE" | "NO") => false,
            _ => raw.app.persist_session,
        };

        let session_ttl_minutes = match raw.app.session_ttl_minutes {
            minutes @ 1..=MAX_SESSION_TTL_MINUTES => minutes,
            minutes => {
                warn!(
                    "Ignoring sessionTtlMinutes ({}) outside 1..={}, using {}",
                    minutes, MAX_SESSION_TTL_MINUTES, DEFAULT_SESSION_TTL_MINUTES
                );
                DEFAULT_SESSION_TTL_MINUTES
            }
        };

        Ok(Self {
            storage_backend,
            persist_session,
            session_ttl_minutes,
        })
    }

    /// Save config to the data directory, preserving unmanaged fields
    pub fn save(&self, data_dir: &Path) -> Result<()> {
        let settings_path = data_dir.join(SETTINGS_FILE);
        let mut settings = read_settings(data_dir)?;

        settings.app.storage_backend = self.storage_backend;
        settings.app.persist_session = self.persist_session;
        settings.app.session_ttl_minutes = self.session_ttl_minutes;

        let content = serde_json::to_string_pretty(&settings)?;
        std::fs::write(&settings_path, content)
            .with_context(|| format!("Failed to write {}", settings_path.display()))?;
        Ok(())
    }

    /// Session lifetime; out-of-range values fall back to the default
    pub fn session_ttl(&self) -> Duration {
        Duration::try_minutes(self.session_ttl_minutes)
            .or_else(|| Duration::try_minutes(DEFAULT_SESSION_TTL_MINUTES))
            .unwrap_or(Duration::MAX)
    }
}

fn read_settings(data_dir: &Path) -> Result<SettingsFile> {
    let settings_path = data_dir.join(SETTINGS_FILE);
    if !settings_path.exists() {
        return Ok(SettingsFile::default());
    }
    let content = std::fs::read_to_string(&settings_path)
        .with_context(|| format!("Failed to read {}", settings_path.display()))?;
    Ok(serde_json::from_str(&content).unwrap_or_else(|e| {
        warn!("Ignoring unreadable {}: {}", settings_path.display(), e);
        SettingsFile::default()
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_load_rejects_non_positive_ttl() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join(SETTINGS_FILE),
            r#"{"app": {"sessionTtlMinutes": 0}}"#,
        )
        .unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.session_ttl_minutes, DEFAULT_SESSION_TTL_MINUTES);
        assert_eq!(config.session_ttl(), Duration::minutes(DEFAULT_SESSION_TTL_MINUTES));
    }

    #[test]
    fn test_load_rejects_huge_ttl() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join(SETTINGS_FILE),
            r#"{"app": {"sessionTtlMinutes": 9000000000000000}}"#,
        )
        .unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.session_ttl_minutes, DEFAULT_SESSION_TTL_MINUTES);
    }

    #[test]
    fn test_load_accepts_ttl_at_upper_bound() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join(SETTINGS_FILE),
            format!(r#"{{"app": {{"sessionTtlMinutes": {}}}}}"#, MAX_SESSION_TTL_MINUTES),
        )
        .unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.session_ttl_minutes, MAX_SESSION_TTL_MINUTES);
    }

    #[test]
    fn test_session_ttl_never_panics() {
        let config = Config {
            session_ttl_minutes: i64::MAX,
            ..Config::default()
        };
        assert_eq!(config.session_ttl(), Duration::minutes(DEFAULT_SESSION_TTL_MINUTES));
    }

    #[test]
    fn test_defaults_without_file() {
        let dir = tempdir().unwrap();
        let raw = read_settings(dir.path()).unwrap();
        assert_eq!(raw.app.storage_backend, StorageBackend::Json);
        assert!(raw.app.persist_session);
        assert_eq!(raw.app.session_ttl_minutes, DEFAULT_SESSION_TTL_MINUTES);
    }

    #[test]
    fn test_reads_camel_case_settings() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join(SETTINGS_FILE),
            r#"{"app": {"storageBackend": "duckdb", "persistSession": false, "sessionTtlMinutes": 15}}"#,
        )
        .unwrap();

        let raw = read_settings(dir.path()).unwrap();
        assert_eq!(raw.app.storage_backend, StorageBackend::DuckDb);
        assert!(!raw.app.persist_session);
        assert_eq!(raw.app.session_ttl_minutes, 15);
    }

    #[test]
    fn test_save_preserves_unknown_fields() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join(SETTINGS_FILE),
            r#"{"app": {"theme": "dark"}, "notifications": {"push": true}}"#,
        )
        .unwrap();

        let config = Config {
            storage_backend: StorageBackend::Memory,
            persist_session: false,
            session_ttl_minutes: 90,
        };
        config.save(dir.path()).unwrap();

        let content = std::fs::read_to_string(dir.path().join(SETTINGS_FILE)).unwrap();
        let json: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(json["app"]["theme"], "dark");
        assert_eq!(json["app"]["storageBackend"], "memory");
        assert_eq!(json["app"]["sessionTtlMinutes"], 90);
        assert_eq!(json["notifications"]["push"], true);
    }

    #[test]
    fn test_garbage_settings_fall_back_to_defaults() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join(SETTINGS_FILE), "not json at all").unwrap();
        let raw = read_settings(dir.path()).unwrap();
        assert_eq!(raw.app.storage_backend, StorageBackend::Json);
    }
}
