//! Authenticated session model and its validity rules

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::user::User;

/// Number of hex characters shown when a token has to be identified
const FINGERPRINT_LEN: usize = 12;

/// An authenticated identity bound to this app instance, with a hard expiry.
///
/// Sessions are never edited in place. A refresh produces a new value that
/// replaces the old one wholesale.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthSession {
    pub user: User,
    /// Opaque bearer token
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl AuthSession {
    pub fn new(user: User, token: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            user,
            token: token.into(),
            expires_at,
        }
    }

    /// Valid iff `now < expires_at`
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        !self.is_valid_at(now)
    }

    /// Time left before expiry, `None` once expired
    pub fn remaining_at(&self, now: DateTime<Utc>) -> Option<Duration> {
        if self.is_valid_at(now) {
            Some(self.expires_at - now)
        } else {
            None
        }
    }

    /// Short SHA-256 prefix of the token, safe to print and log
    pub fn token_fingerprint(&self) -> String {
        let digest = Sha256::digest(self.token.as_bytes());
        let mut encoded = hex::encode(digest);
        encoded.truncate(FINGERPRINT_LEN);
        encoded
    }
}

impl fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthSession")
            .field("user", &self.user)
            .field("token", &format_args!("<redacted:{}>", self.token_fingerprint()))
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Authorisation view of whatever session is resident
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Anonymous,
    Authenticated(AuthSession),
}

impl SessionState {
    /// Classify a resident session at `now`. Expired sessions are `Anonymous`.
    pub fn evaluate(resident: Option<&AuthSession>, now: DateTime<Utc>) -> Self {
        match resident {
            Some(session) if session.is_valid_at(now) => {
                SessionState::Authenticated(session.clone())
            }
            _ => SessionState::Anonymous,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated(_))
    }

    pub fn session(&self) -> Option<&AuthSession> {
        match self {
            SessionState::Authenticated(session) => Some(session),
            SessionState::Anonymous => None,
        }
    }

    pub fn user(&self) -> Option<&User> {
        self.session().map(|s| &s.user)
    }

    pub fn into_session(self) -> Option<AuthSession> {
        match self {
            SessionState::Authenticated(session) => Some(session),
            SessionState::Anonymous => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SessionState::Anonymous => "anonymous",
            SessionState::Authenticated(_) => "authenticated",
        }
    }
}
