//! Durable key-value storage port
//!
//! The single capability the persistence layer needs from its host: a flat
//! string-to-string map. Writes are last-write-wins and removal is idempotent.

use crate::domain::result::Result;

/// Key-value storage abstraction
///
/// Implementations (adapters) decide where values live: memory, a JSON file,
/// DuckDB, or nowhere at all.
pub trait KeyValueStorage: Send + Sync {
    /// Short backend name for status output (e.g., "json", "duckdb")
    fn backend_name(&self) -> &str;

    /// Read a value. `Ok(None)` when the key was never set.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store a value, replacing any previous one unconditionally
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a value. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<()>;
}
