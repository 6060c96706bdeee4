//! Locality store - remembers the selected town between runs
//!
//! Stores exactly one value: the id of the selected town, under
//! [`SELECTED_TOWN_KEY`]. The full [`Town`] is always resolved through the
//! catalog, never persisted.
//!
//! Selection is a convenience, so nothing here fails: backend errors are
//! logged and the store behaves as if nothing had ever been stored.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::domain::{Town, TownId};
use crate::ports::{KeyValueStorage, TownCatalog};

use super::availability::StorageAvailability;

/// Storage key holding the selected town id
pub const SELECTED_TOWN_KEY: &str = "renizo_selected_town";

pub struct LocalityStore {
    storage: Arc<dyn KeyValueStorage>,
    persistent: bool,
}

impl LocalityStore {
    pub fn new(availability: StorageAvailability) -> Self {
        let persistent = availability.is_available();
        Self {
            storage: availability.into_storage(),
            persistent,
        }
    }

    /// Store for hosts without persistent storage
    pub fn headless() -> Self {
        Self::new(StorageAvailability::Unavailable {
            reason: "headless".to_string(),
        })
    }

    /// Whether selections outlive this process
    pub fn is_persistent(&self) -> bool {
        self.persistent
    }

    pub fn backend_name(&self) -> &str {
        self.storage.backend_name()
    }

    /// Previously selected town id, if any
    pub fn get_selected_town_id(&self) -> Option<TownId> {
        let raw = match self.storage.get(SELECTED_TOWN_KEY) {
            Ok(raw) => raw?,
            Err(e) => {
                warn!("Failed to read selected town: {}", e);
                return None;
            }
        };
        match TownId::new(raw) {
            Ok(id) => Some(id),
            Err(_) => {
                warn!("Ignoring empty selected town id in storage");
                None
            }
        }
    }

    /// Remember `id`, replacing any earlier selection
    pub fn set_selected_town_id(&self, id: &TownId) {
        match self.storage.set(SELECTED_TOWN_KEY, id.as_str()) {
            Ok(()) => debug!("Selected town {}", id),
            Err(e) => warn!("Failed to persist selected town {}: {}", id, e),
        }
    }

    /// Forget the selection. Does nothing when there is none.
    pub fn clear_selected_town_id(&self) {
        match self.storage.remove(SELECTED_TOWN_KEY) {
            Ok(()) => debug!("Cleared selected town"),
            Err(e) => warn!("Failed to clear selected town: {}", e),
        }
    }

    pub fn has_selected_town(&self) -> bool {
        self.get_selected_town_id().is_some()
    }

    /// Remember `town` by its id
    pub fn select_town(&self, town: &Town) {
        self.set_selected_town_id(&town.id);
    }

    /// Resolve the stored id through `catalog`.
    ///
    /// An id the catalog does not know resolves to `None` but stays stored,
    /// so a catalog outage does not erase the user's choice.
    pub fn resolve_selected_town(&self, catalog: &dyn TownCatalog) -> Option<Town> {
        let id = self.get_selected_town_id()?;
        let town = catalog.find_town(&id);
        if town.is_none() {
            debug!("Selected town {} is not in the catalog", id);
        }
        town
    }
}
