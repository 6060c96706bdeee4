//! Login and registration payloads
//!
//! Both are transient: they are handed to the identity service and dropped.
//! Neither implements `Serialize`, so they cannot end up in storage by mistake.

use std::fmt;

use super::user::UserRole;

pub struct LoginCredentials {
    pub email: String,
    pub password: String,
}

impl LoginCredentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for LoginCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginCredentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Sign-up form contents. Validation belongs to the identity service.
pub struct RegisterData {
    pub email: String,
    pub password: String,
    pub name: String,
    pub phone: String,
    pub role: UserRole,
}

impl RegisterData {
    pub fn credentials(&self) -> LoginCredentials {
        LoginCredentials::new(self.email.clone(), self.password.clone())
    }
}

impl fmt::Debug for RegisterData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterData")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("name", &self.name)
            .field("phone", &self.phone)
            .field("role", &self.role)
            .finish()
    }
}
