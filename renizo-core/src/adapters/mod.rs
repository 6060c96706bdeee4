//! Adapter implementations
//!
//! Adapters implement the port traits with concrete technologies:
//! - In-memory map, JSON file and DuckDB for the KeyValueStorage port
//! - A no-op store for hosts without persistent storage
//! - Demo identity provider and town catalog standing in for the external services
//! - A manually driven clock for tests and demos

pub mod clock;
pub mod demo;
pub mod duckdb;
pub mod json_file;
pub mod memory;
pub mod noop;

pub use clock::ManualClock;
pub use demo::{DemoIdentityProvider, DemoTownCatalog};
pub use self::duckdb::DuckDbStorage;
pub use json_file::JsonFileStorage;
pub use memory::MemoryStorage;
pub use noop::NoopStorage;
