//! Town catalog port - resolves persisted ids into full towns

use crate::domain::{Town, TownId};

pub trait TownCatalog: Send + Sync {
    /// Look a town up by id. `None` when the catalog does not know it.
    fn find_town(&self, id: &TownId) -> Option<Town>;

    /// All towns the app currently serves
    fn list_towns(&self) -> Vec<Town>;
}
