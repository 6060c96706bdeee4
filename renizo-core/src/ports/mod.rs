//! Port definitions (hexagonal architecture)
//!
//! Ports define the interfaces for external dependencies. The core depends
//! only on these traits, not on concrete implementations.

mod clock;
mod identity;
mod storage;
mod town_catalog;

pub use clock::{Clock, SystemClock};
pub use identity::IdentityProvider;
pub use storage::KeyValueStorage;
pub use town_catalog::TownCatalog;
