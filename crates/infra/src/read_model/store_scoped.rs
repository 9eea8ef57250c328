use std::collections::HashMap;
use std::hash::Hash;
use std::sync::RwLock;

use stockwise_core::StoreId;
use std::sync::Arc;

/// Store-partitioned key/value store for disposable read models.
pub trait StoreScopedStore<K, V>: Send + Sync {
    fn get(&self, store_id: StoreId, key: &K) -> Option<V>;
    fn upsert(&self, store_id: StoreId, key: K, value: V);
    fn list(&self, store_id: StoreId) -> Vec<V>;
    /// Clear every record of every store (rebuild support).
    fn clear_all(&self);
}

impl<K, V, S> StoreScopedStore<K, V> for Arc<S>
where
    S: StoreScopedStore<K, V> + ?Sized,
{
    fn get(&self, store_id: StoreId, key: &K) -> Option<V> {
        (**self).get(store_id, key)
    }

    fn upsert(&self, store_id: StoreId, key: K, value: V) {
        (**self).upsert(store_id, key, value)
    }

    fn list(&self, store_id: StoreId) -> Vec<V> {
        (**self).list(store_id)
    }

    fn clear_all(&self) {
        (**self).clear_all()
    }
}

/// In-memory store-partitioned store for tests/dev.
#[derive(Debug)]
pub struct InMemoryStoreScopedStore<K, V> {
    inner: RwLock<HashMap<(StoreId, K), V>>,
}

impl<K, V> InMemoryStoreScopedStore<K, V> {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }
}

impl<K, V> Default for InMemoryStoreScopedStore<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> StoreScopedStore<K, V> for InMemoryStoreScopedStore<K, V>
where
    K: Clone + Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn get(&self, store_id: StoreId, key: &K) -> Option<V> {
        let map = self.inner.read().ok()?;
        map.get(&(store_id, key.clone())).cloned()
    }

    fn upsert(&self, store_id: StoreId, key: K, value: V) {
        if let Ok(mut map) = self.inner.write() {
            map.insert((store_id, key), value);
        }
    }

    fn list(&self, store_id: StoreId) -> Vec<V> {
        let map = match self.inner.read() {
            Ok(m) => m,
            Err(_) => return vec![],
        };

        map.iter()
            .filter_map(|((s, _k), v)| if *s == store_id { Some(v.clone()) } else { None })
            .collect()
    }

    fn clear_all(&self) {
        if let Ok(mut map) = self.inner.write() {
            map.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_are_partitioned_by_store() {
        let rm: InMemoryStoreScopedStore<&'static str, i64> = InMemoryStoreScopedStore::new();
        let (north, south) = (StoreId::new(), StoreId::new());

        rm.upsert(north, "bolt", 4);
        rm.upsert(south, "bolt", 9);

        assert_eq!(rm.get(north, &"bolt"), Some(4));
        assert_eq!(rm.list(south), vec![9]);

        rm.clear_all();
        assert!(rm.list(north).is_empty());
    }
}
