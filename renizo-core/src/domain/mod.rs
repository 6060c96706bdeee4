//! Core domain entities
//!
//! All entities are defined here. These are pure data structures with
//! validation logic - no I/O or external dependencies.

mod auth_error;
mod credentials;
pub mod result;
mod session;
mod town;
mod user;

pub use auth_error::{AuthError, AuthErrorCode};
pub use credentials::{LoginCredentials, RegisterData};
pub use session::{AuthSession, SessionState};
pub use town::{Town, TownId};
pub use user::{User, UserRole};
