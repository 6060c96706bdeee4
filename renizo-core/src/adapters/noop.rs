//! Storage for hosts without a persistence backend
//!
//! Nothing is ever stored: reads are absent and writes succeed silently.

use crate::domain::result::Result;
use crate::ports::KeyValueStorage;

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopStorage;

impl KeyValueStorage for NoopStorage {
    fn backend_name(&self) -> &str {
        "none"
    }

    fn get(&self, _key: &str) -> Result<Option<String>> {
        Ok(None)
    }

    fn set(&self, _key: &str, _value: &str) -> Result<()> {
        Ok(())
    }

    fn remove(&self, _key: &str) -> Result<()> {
        Ok(())
    }
}
