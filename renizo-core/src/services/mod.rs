//! Service layer - business logic orchestration
//!
//! Services coordinate domain rules and port interactions. Each service
//! focuses on a specific use case or feature area.

mod availability;
mod locality;
pub mod logging;
pub mod migration;
mod session;

pub use availability::{StorageAvailability, StorageBackend};
pub use locality::{LocalityStore, SELECTED_TOWN_KEY};
pub use logging::{EntryPoint, LogEntry, LogEvent, LoggingService};
pub use migration::{MigrationResult, MigrationService};
pub use session::{SessionService, SESSION_KEY};
