//! Session service - holds the one authenticated session of the app
//!
//! Lifecycle:
//! - `Anonymous --login/register--> Authenticated(session)`
//! - `Authenticated --logout--> Anonymous`
//! - `Authenticated --refresh--> Authenticated(new session)` (wholesale replacement)
//! - `Authenticated --expiry--> Anonymous`, checked lazily on every read
//!
//! An expired session may stay resident until it is cleared, but no read
//! treats it as authenticated. There is no background timer.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};

use tracing::{debug, info, warn};

use crate::domain::{AuthError, AuthSession, LoginCredentials, RegisterData, SessionState, User};
use crate::ports::{Clock, IdentityProvider, KeyValueStorage};

/// Storage key holding the persisted session (JSON)
pub const SESSION_KEY: &str = "renizo_session";

pub struct SessionService {
    identity: Arc<dyn IdentityProvider>,
    clock: Arc<dyn Clock>,
    storage: Option<Arc<dyn KeyValueStorage>>,
    resident: Mutex<Option<AuthSession>>,
}

impl SessionService {
    /// Session kept in memory only
    pub fn new(identity: Arc<dyn IdentityProvider>, clock: Arc<dyn Clock>) -> Self {
        Self {
            identity,
            clock,
            storage: None,
            resident: Mutex::new(None),
        }
    }

    /// Session mirrored into `storage`, restoring any persisted one
    pub fn with_persistence(
        identity: Arc<dyn IdentityProvider>,
        clock: Arc<dyn Clock>,
        storage: Arc<dyn KeyValueStorage>,
    ) -> Self {
        let service = Self {
            identity,
            clock,
            storage: Some(storage),
            resident: Mutex::new(None),
        };
        service.restore();
        service
    }

    pub fn identity_name(&self) -> &str {
        self.identity.name()
    }

    pub fn is_persistent(&self) -> bool {
        self.storage.is_some()
    }

    fn resident_guard(&self) -> MutexGuard<'_, Option<AuthSession>> {
        self.resident.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Load the persisted session, discarding it when expired or unreadable
    pub fn restore(&self) -> SessionState {
        let Some(storage) = &self.storage else {
            return self.state();
        };

        let raw = match storage.get(SESSION_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return self.state(),
            Err(e) => {
                warn!("Failed to read persisted session: {}", e);
                return self.state();
            }
        };

        match serde_json::from_str::<AuthSession>(&raw) {
            Ok(session) if session.is_valid_at(self.clock.now()) => {
                debug!(
                    "Restored session {} for user {}",
                    session.token_fingerprint(),
                    session.user.id
                );
                *self.resident_guard() = Some(session);
            }
            Ok(session) => {
                debug!("Discarding expired session {}", session.token_fingerprint());
                self.forget_persisted();
            }
            Err(e) => {
                warn!("Discarding unreadable persisted session: {}", e);
                self.forget_persisted();
            }
        }

        self.state()
    }

    /// Current time on the clock this service judges expiry by
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Authorisation view at the current time
    pub fn state(&self) -> SessionState {
        SessionState::evaluate(self.resident_guard().as_ref(), self.clock.now())
    }

    /// The session, only while it is valid
    pub fn current(&self) -> Option<AuthSession> {
        self.state().into_session()
    }

    pub fn current_user(&self) -> Option<User> {
        self.current().map(|s| s.user)
    }

    pub fn is_authenticated(&self) -> bool {
        self.state().is_authenticated()
    }

    /// Whatever is held in memory, expired or not. Not for authorisation.
    pub fn resident(&self) -> Option<AuthSession> {
        self.resident_guard().clone()
    }

    pub fn login(&self, credentials: &LoginCredentials) -> Result<AuthSession, AuthError> {
        match self.identity.login(credentials) {
            Ok(session) => self.install(session),
            Err(e) => {
                debug!("Login failed: {}", e.code);
                Err(e)
            }
        }
    }

    pub fn register(&self, data: &RegisterData) -> Result<AuthSession, AuthError> {
        match self.identity.register(data) {
            Ok(session) => self.install(session),
            Err(e) => {
                debug!("Registration failed: {}", e.code);
                Err(e)
            }
        }
    }

    /// Swap the valid session for a fresh one.
    ///
    /// `Ok(None)` when there is no valid session to refresh. On error the
    /// current session is left as it was.
    pub fn refresh(&self) -> Result<Option<AuthSession>, AuthError> {
        let Some(current) = self.current() else {
            return Ok(None);
        };
        match self.identity.refresh(&current) {
            Ok(session) => self.install(session).map(Some),
            Err(e) => {
                debug!("Refresh of {} failed: {}", current.token_fingerprint(), e.code);
                Err(e)
            }
        }
    }

    /// End the session. Returns whether anything was resident.
    pub fn logout(&self) -> bool {
        let previous = self.resident_guard().take();
        self.forget_persisted();
        if let Some(session) = &previous {
            info!("Signed out session {}", session.token_fingerprint());
        }
        previous.is_some()
    }

    /// Drop a resident session that has expired. Returns whether one was dropped.
    pub fn clear_if_expired(&self) -> bool {
        let now = self.clock.now();
        let expired = {
            let mut resident = self.resident_guard();
            match resident.as_ref() {
                Some(session) if session.is_expired_at(now) => resident.take(),
                _ => None,
            }
        };
        match expired {
            Some(session) => {
                debug!("Cleared expired session {}", session.token_fingerprint());
                self.forget_persisted();
                true
            }
            None => false,
        }
    }

    fn install(&self, session: AuthSession) -> Result<AuthSession, AuthError> {
        if session.is_expired_at(self.clock.now()) {
            return Err(AuthError::unknown(
                "Identity service returned a session that has already expired",
            ));
        }

        *self.resident_guard() = Some(session.clone());
        self.persist(&session);
        info!(
            "Session {} active for user {} until {}",
            session.token_fingerprint(),
            session.user.id,
            session.expires_at
        );
        Ok(session)
    }

    fn persist(&self, session: &AuthSession) {
        let Some(storage) = &self.storage else {
            return;
        };
        let result = serde_json::to_string(session)
            .map_err(Into::into)
            .and_then(|json| storage.set(SESSION_KEY, &json));
        if let Err(e) = result {
            warn!("Failed to persist session: {}", e);
        }
    }

    fn forget_persisted(&self) {
        if let Some(storage) = &self.storage {
            if let Err(e) = storage.remove(SESSION_KEY) {
                warn!("Failed to remove persisted session: {}", e);
            }
        }
    }
}
