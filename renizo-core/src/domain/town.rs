//! Town domain model

use std::fmt;

use serde::{Deserialize, Serialize};

use super::result::{Error, Result};

/// Identifier of a service area.
///
/// Always non-empty, so anything holding a `TownId` can persist it without
/// further checks. The value is kept exactly as given: what is stored is what
/// is read back.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TownId(String);

impl TownId {
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.is_empty() {
            return Err(Error::validation("Town id must not be empty"));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for TownId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<TownId> for String {
    fn from(id: TownId) -> Self {
        id.0
    }
}

impl AsRef<str> for TownId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TownId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A named service area that bookings and providers are scoped to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Town {
    pub id: TownId,
    /// Display only; may be refreshed from the catalog independently of `id`
    pub name: String,
}

impl Town {
    pub fn new(id: TownId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}
