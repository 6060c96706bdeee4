//! Renizo Core - session and locality persistence for the Renizo app
//!
//! This crate follows hexagonal architecture:
//!
//! - **domain**: Core entities (Town, User, AuthSession, AuthError, ...)
//! - **ports**: Trait definitions for external dependencies (storage, identity, catalog, clock)
//! - **services**: Locality store, session lifecycle, event log
//! - **adapters**: Concrete implementations (JSON file, DuckDB, in-memory, demo services)

pub mod adapters;
pub mod config;
pub mod domain;
pub mod log_migrations;
pub mod migrations;
pub mod ports;
pub mod services;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use serde::Serialize;
use tracing::{debug, warn};

use adapters::{DemoIdentityProvider, DemoTownCatalog};
use config::Config;
use ports::{Clock, IdentityProvider, KeyValueStorage, SystemClock, TownCatalog};
use services::{LocalityStore, SessionService, StorageAvailability, SELECTED_TOWN_KEY, SESSION_KEY};

// Re-export commonly used types at crate root
pub use domain::result::{Error, OperationResult};
pub use domain::{
    AuthError, AuthErrorCode, AuthSession, LoginCredentials, RegisterData, SessionState, Town,
    TownId, User, UserRole,
};
pub use services::{EntryPoint, LogEvent, LoggingService, StorageBackend};

/// Where selections and sessions are being kept
#[derive(Debug, Clone, Serialize)]
pub struct StorageStatus {
    pub backend: String,
    pub persistent: bool,
    pub persist_session: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unavailable_reason: Option<String>,
}

/// The app shell
///
/// Owns the single locality store and the single session holder, wired to
/// one storage backend that is probed once, at construction.
pub struct RenizoContext {
    pub config: Config,
    pub data_dir: PathBuf,
    pub locality: LocalityStore,
    pub sessions: SessionService,
    pub catalog: Arc<dyn TownCatalog>,
    storage: Arc<dyn KeyValueStorage>,
    unavailable_reason: Option<String>,
}

impl RenizoContext {
    /// Context backed by `data_dir`, using the demo identity service and catalog
    pub fn new(data_dir: &Path) -> Result<Self> {
        let config = Config::load(data_dir)?;
        let identity = Arc::new(DemoIdentityProvider::new(config.session_ttl()));
        Ok(Self::with_collaborators(
            data_dir,
            config,
            identity,
            Arc::new(DemoTownCatalog::new()),
            Arc::new(SystemClock),
        ))
    }

    /// Context with explicit collaborators
    pub fn with_collaborators(
        data_dir: &Path,
        config: Config,
        identity: Arc<dyn IdentityProvider>,
        catalog: Arc<dyn TownCatalog>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let availability = StorageAvailability::probe(config.storage_backend, data_dir);
        let unavailable_reason = availability.reason().map(str::to_string);
        let storage = availability.into_storage();

        let locality = match &unavailable_reason {
            None => LocalityStore::new(StorageAvailability::from_storage(Arc::clone(&storage))),
            Some(reason) => LocalityStore::new(StorageAvailability::Unavailable {
                reason: reason.clone(),
            }),
        };

        let sessions = if config.persist_session && unavailable_reason.is_none() {
            SessionService::with_persistence(identity, clock, Arc::clone(&storage))
        } else {
            SessionService::new(identity, clock)
        };

        debug!(
            "Context ready: storage={}, persist_session={}",
            storage.backend_name(),
            sessions.is_persistent()
        );

        Self {
            config,
            data_dir: data_dir.to_path_buf(),
            locality,
            sessions,
            catalog,
            storage,
            unavailable_reason,
        }
    }

    pub fn storage_status(&self) -> StorageStatus {
        StorageStatus {
            backend: self.storage.backend_name().to_string(),
            persistent: self.locality.is_persistent(),
            persist_session: self.sessions.is_persistent(),
            unavailable_reason: self.unavailable_reason.clone(),
        }
    }

    /// Selected town, resolved through the catalog
    pub fn selected_town(&self) -> Option<Town> {
        self.locality.resolve_selected_town(self.catalog.as_ref())
    }

    /// Select a town the catalog knows about
    pub fn select_town(&self, id: &TownId) -> domain::result::Result<Town> {
        let town = self
            .catalog
            .find_town(id)
            .ok_or_else(|| Error::validation(format!("Unknown town '{}'", id)))?;
        self.locality.select_town(&town);
        Ok(town)
    }

    /// App-level sign-out: ends the session and forgets the selected town.
    /// Returns whether a session was resident.
    pub fn sign_out(&self) -> bool {
        let had_session = self.sessions.logout();
        self.locality.clear_selected_town_id();
        had_session
    }

    /// Remove everything this crate persists, including a session left behind
    /// while session persistence was switched off.
    pub fn reset(&self) {
        self.sign_out();
        for key in [SELECTED_TOWN_KEY, SESSION_KEY] {
            if let Err(e) = self.storage.remove(key) {
                warn!("Failed to remove {}: {}", key, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::demo::{DEMO_CUSTOMER_EMAIL, DEMO_CUSTOMER_PASSWORD};
    use crate::adapters::ManualClock;
    use chrono::{Duration, TimeZone, Utc};
    use tempfile::tempdir;

    fn context(dir: &Path, config: Config) -> (RenizoContext, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2025, 2, 1, 10, 0, 0).unwrap(),
        ));
        let identity = Arc::new(DemoIdentityProvider::with_clock(
            config.session_ttl(),
            clock.clone(),
        ));
        let ctx = RenizoContext::with_collaborators(
            dir,
            config,
            identity,
            Arc::new(DemoTownCatalog::new()),
            clock.clone(),
        );
        (ctx, clock)
    }

    fn customer() -> LoginCredentials {
        LoginCredentials::new(DEMO_CUSTOMER_EMAIL, DEMO_CUSTOMER_PASSWORD)
    }

    #[test]
    fn test_selection_and_session_survive_restart() {
        let dir = tempdir().unwrap();
        {
            let (ctx, _) = context(dir.path(), Config::default());
            ctx.select_town(&TownId::new("porto").unwrap()).unwrap();
            ctx.sessions.login(&customer()).unwrap();
        }

        let (ctx, _) = context(dir.path(), Config::default());
        assert_eq!(ctx.selected_town().map(|t| t.name), Some("Porto".to_string()));
        assert!(ctx.sessions.is_authenticated());
        assert_eq!(ctx.storage_status().backend, "json");
    }

    #[test]
    fn test_unknown_town_is_rejected() {
        let dir = tempdir().unwrap();
        let (ctx, _) = context(dir.path(), Config::default());
        let err = ctx.select_town(&TownId::new("atlantis").unwrap()).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(!ctx.locality.has_selected_town());
    }

    #[test]
    fn test_sign_out_clears_town_and_session() {
        let dir = tempdir().unwrap();
        let (ctx, _) = context(dir.path(), Config::default());
        ctx.select_town(&TownId::new("faro").unwrap()).unwrap();
        ctx.sessions.login(&customer()).unwrap();

        assert!(ctx.sign_out());
        assert!(!ctx.locality.has_selected_town());
        assert_eq!(ctx.sessions.state(), SessionState::Anonymous);
        assert!(!ctx.sign_out());
    }

    #[test]
    fn test_session_persistence_can_be_disabled() {
        let dir = tempdir().unwrap();
        let config = Config {
            persist_session: false,
            ..Config::default()
        };
        {
            let (ctx, _) = context(dir.path(), config.clone());
            ctx.sessions.login(&customer()).unwrap();
            ctx.select_town(&TownId::new("braga").unwrap()).unwrap();
            assert!(!ctx.storage_status().persist_session);
        }
        let (ctx, _) = context(dir.path(), config);
        assert!(!ctx.sessions.is_authenticated());
        assert!(ctx.locality.has_selected_town());
    }

    #[test]
    fn test_reset_removes_leftover_session() {
        let dir = tempdir().unwrap();
        {
            let (ctx, _) = context(dir.path(), Config::default());
            ctx.sessions.login(&customer()).unwrap();
        }
        let config = Config {
            persist_session: false,
            ..Config::default()
        };
        let (ctx, _) = context(dir.path(), config);
        ctx.reset();

        let (ctx, _) = context(dir.path(), Config::default());
        assert!(!ctx.sessions.is_authenticated());
    }

    #[test]
    fn test_restored_session_expires_lazily() {
        let dir = tempdir().unwrap();
        let config = Config {
            session_ttl_minutes: 5,
            ..Config::default()
        };
        {
            let (ctx, _) = context(dir.path(), config.clone());
            ctx.sessions.login(&customer()).unwrap();
        }

        let (ctx, clock) = context(dir.path(), config);
        assert!(ctx.sessions.is_authenticated());

        clock.advance(Duration::minutes(6));
        assert!(!ctx.sessions.is_authenticated());
        assert!(ctx.sessions.resident().is_some());
    }

    #[test]
    fn test_huge_ttl_in_settings_falls_back() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join(config::SETTINGS_FILE),
            r#"{"app": {"sessionTtlMinutes": 9000000000000000}}"#,
        )
        .unwrap();

        let ctx = RenizoContext::new(dir.path()).unwrap();
        let session = ctx.sessions.login(&customer()).unwrap();
        assert!(session.expires_at > Utc::now());
        assert!(ctx.sessions.is_authenticated());
    }

    #[test]
    fn test_headless_context() {
        let dir = tempdir().unwrap();
        let config = Config {
            storage_backend: StorageBackend::None,
            ..Config::default()
        };
        let (ctx, _) = context(dir.path(), config);
        let status = ctx.storage_status();
        assert!(!status.persistent);
        assert!(!status.persist_session);
        assert!(status.unavailable_reason.is_some());

        ctx.select_town(&TownId::new("lisbon").unwrap()).unwrap();
        assert!(ctx.selected_town().is_none());

        ctx.sessions.login(&customer()).unwrap();
        assert!(ctx.sessions.is_authenticated());
    }
}
