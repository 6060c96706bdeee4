//! Identity service port
//!
//! Login and registration are owned by an external service. The core only
//! consumes its results: a fresh [`AuthSession`] or a structured [`AuthError`].

use crate::domain::{AuthError, AuthSession, LoginCredentials, RegisterData};

/// Identity service abstraction
pub trait IdentityProvider: Send + Sync {
    /// Provider name (e.g., "demo")
    fn name(&self) -> &str;

    /// Exchange credentials for a session
    fn login(&self, credentials: &LoginCredentials) -> Result<AuthSession, AuthError>;

    /// Create an account and sign it in
    fn register(&self, data: &RegisterData) -> Result<AuthSession, AuthError>;

    /// Trade a still-valid session for a new one with a later expiry
    fn refresh(&self, session: &AuthSession) -> Result<AuthSession, AuthError>;
}
