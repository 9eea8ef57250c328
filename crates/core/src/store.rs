//! Store directory (read-only collaborator).

use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use crate::id::StoreId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Store {
    pub id: StoreId,
    pub name: String,
    pub city: String,
    pub is_headquarters: bool,
    pub active: bool,
}

impl Store {
    pub fn new(id: StoreId, name: impl Into<String>, city: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            city: city.into(),
            is_headquarters: false,
            active: true,
        }
    }

    pub fn headquarters(mut self) -> Self {
        self.is_headquarters = true;
        self
    }
}

/// Read-only list of stores known to the system.
pub trait StoreDirectory: Send + Sync {
    /// Active stores only.
    fn active_stores(&self) -> Vec<Store>;

    fn get(&self, store_id: StoreId) -> Option<Store> {
        self.active_stores().into_iter().find(|s| s.id == store_id)
    }
}

impl<D> StoreDirectory for std::sync::Arc<D>
where
    D: StoreDirectory + ?Sized,
{
    fn active_stores(&self) -> Vec<Store> {
        (**self).active_stores()
    }

    fn get(&self, store_id: StoreId) -> Option<Store> {
        (**self).get(store_id)
    }
}

/// In-memory directory for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryStoreDirectory {
    stores: RwLock<Vec<Store>>,
}

impl InMemoryStoreDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stores(stores: impl IntoIterator<Item = Store>) -> Self {
        Self {
            stores: RwLock::new(stores.into_iter().collect()),
        }
    }

    /// Insert or replace a store by id.
    pub fn upsert(&self, store: Store) {
        if let Ok(mut stores) = self.stores.write() {
            stores.retain(|s| s.id != store.id);
            stores.push(store);
        }
    }
}

impl StoreDirectory for InMemoryStoreDirectory {
    fn active_stores(&self) -> Vec<Store> {
        let stores = match self.stores.read() {
            Ok(s) => s,
            Err(_) => return vec![],
        };
        stores.iter().filter(|s| s.active).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inactive_stores_are_hidden() {
        let open = Store::new(StoreId::new(), "Centro", "Lisboa").headquarters();
        let mut closed = Store::new(StoreId::new(), "Norte", "Porto");
        closed.active = false;

        let directory = InMemoryStoreDirectory::with_stores([open.clone(), closed.clone()]);

        assert_eq!(directory.active_stores(), vec![open.clone()]);
        assert!(directory.get(closed.id).is_none());
        assert!(directory.get(open.id).unwrap().is_headquarters);
    }
}
