//! The [`ArtifactStore`] trait defining the storage contract for woven
//! artifacts.
//!
//! Backends store opaque JSON payloads keyed by [`CacheKey`]. All methods
//! take `&self`; backends synchronize internally so one store can be shared
//! by every loader thread.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{CacheCorruptionError, StorageError};
use crate::types::CacheKey;

/// The storage contract for woven artifacts.
pub trait ArtifactStore: Send + Sync {
    /// Loads the payload stored under `key`, if any.
    fn load(&self, key: &CacheKey) -> Result<Option<String>, StorageError>;

    /// Stores `payload` under `key`, replacing any previous payload.
    fn save(&self, key: &CacheKey, payload: &str) -> Result<(), StorageError>;

    /// Removes the payload under `key`. Returns whether one existed.
    fn remove(&self, key: &CacheKey) -> Result<bool, StorageError>;

    /// Lists every stored key.
    fn keys(&self) -> Result<Vec<CacheKey>, StorageError>;
}

/// Serializes an artifact for [`ArtifactStore::save`].
pub fn encode_artifact<T: Serialize>(artifact: &T) -> Result<String, StorageError> {
    Ok(serde_json::to_string(artifact)?)
}

/// Deserializes a payload loaded from a store.
pub fn decode_artifact<T: DeserializeOwned>(key: &CacheKey, payload: &str) -> Result<T, CacheCorruptionError> {
    serde_json::from_str(payload).map_err(|e| CacheCorruptionError::Decode {
        key: key.clone(),
        reason: e.to_string(),
    })
}
