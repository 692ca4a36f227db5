//! In-memory implementation of [`ArtifactStore`].
//!
//! Backed by a [`DashMap`], so concurrent loaders never block each other on
//! unrelated keys. Contents live as long as the store.

use dashmap::DashMap;

use crate::error::StorageError;
use crate::traits::ArtifactStore;
use crate::types::CacheKey;

#[derive(Debug, Default)]
pub struct InMemoryArtifactStore {
    artifacts: DashMap<CacheKey, String>,
}

impl InMemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }
}

impl ArtifactStore for InMemoryArtifactStore {
    fn load(&self, key: &CacheKey) -> Result<Option<String>, StorageError> {
        Ok(self.artifacts.get(key).map(|entry| entry.value().clone()))
    }

    fn save(&self, key: &CacheKey, payload: &str) -> Result<(), StorageError> {
        self.artifacts.insert(key.clone(), payload.to_string());
        Ok(())
    }

    fn remove(&self, key: &CacheKey) -> Result<bool, StorageError> {
        Ok(self.artifacts.remove(key).is_some())
    }

    fn keys(&self) -> Result<Vec<CacheKey>, StorageError> {
        Ok(self.artifacts.iter().map(|entry| entry.key().clone()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Fingerprint;

    fn key(n: u8) -> CacheKey {
        CacheKey {
            structure_id: "Queue".into(),
            definition: Fingerprint([n; 32]),
            policy: Fingerprint([0; 32]),
        }
    }

    #[test]
    fn save_load_remove() {
        let store = InMemoryArtifactStore::new();
        assert!(store.is_empty());
        assert_eq!(store.load(&key(1)).unwrap(), None);

        store.save(&key(1), "{}").unwrap();
        store.save(&key(1), "{\"v\":2}").unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.load(&key(1)).unwrap().as_deref(), Some("{\"v\":2}"));

        assert!(store.remove(&key(1)).unwrap());
        assert!(!store.remove(&key(1)).unwrap());
        assert!(store.keys().unwrap().is_empty());
    }

    #[test]
    fn keys_are_distinct_per_fingerprint() {
        let store = InMemoryArtifactStore::new();
        store.save(&key(1), "a").unwrap();
        store.save(&key(2), "b").unwrap();
        let mut keys = store.keys().unwrap();
        keys.sort_by_key(|k| k.definition.0);
        assert_eq!(keys, vec![key(1), key(2)]);
    }
}
