//! Identity service error model

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Machine-checkable discriminator for identity failures.
///
/// Callers branch on this, never on [`AuthError::message`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthErrorCode {
    /// Wrong email/password pair, or an unknown token. Re-prompt.
    InvalidCredentials,
    /// Registration with an email that already has an account. Re-prompt.
    UserExists,
    /// Transport failure. Safe to retry the same request.
    NetworkError,
    /// Anything the identity service did not classify. Not retried.
    Unknown,
}

impl AuthErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthErrorCode::InvalidCredentials => "INVALID_CREDENTIALS",
            AuthErrorCode::UserExists => "USER_EXISTS",
            AuthErrorCode::NetworkError => "NETWORK_ERROR",
            AuthErrorCode::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for AuthErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured error returned by the identity service
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{message}")]
pub struct AuthError {
    pub code: AuthErrorCode,
    /// Display text only
    pub message: String,
}

impl AuthError {
    pub fn new(code: AuthErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn invalid_credentials(message: impl Into<String>) -> Self {
        Self::new(AuthErrorCode::InvalidCredentials, message)
    }

    pub fn user_exists(message: impl Into<String>) -> Self {
        Self::new(AuthErrorCode::UserExists, message)
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(AuthErrorCode::NetworkError, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(AuthErrorCode::Unknown, message)
    }

    /// Transient failures the caller may resend unchanged
    pub fn is_retryable(&self) -> bool {
        matches!(self.code, AuthErrorCode::NetworkError)
    }

    /// Failures the user can fix by editing the form and trying again
    pub fn is_user_correctable(&self) -> bool {
        matches!(
            self.code,
            AuthErrorCode::InvalidCredentials | AuthErrorCode::UserExists
        )
    }
}
