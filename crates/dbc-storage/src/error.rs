//! Storage error types for dbc-storage.
//!
//! [`StorageError`] covers backend failures. [`CacheCorruptionError`] is
//! separate: a stored artifact that cannot be used is recovered by the cache
//! and never reaches a caller.

use thiserror::Error;

use crate::types::CacheKey;

/// Errors produced by storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// SQLite returned an error.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Applying schema migrations failed.
    #[error("migration error: {0}")]
    Migration(String),

    /// JSON serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored row does not describe a valid key.
    #[error("integrity error: {reason}")]
    IntegrityError { reason: String },

    /// Another thread panicked while holding the connection.
    #[error("storage lock poisoned")]
    LockPoisoned,
}

/// A stored artifact that cannot be re-attached.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheCorruptionError {
    /// The payload does not deserialize.
    #[error("artifact for {key} does not decode: {reason}")]
    Decode { key: CacheKey, reason: String },

    /// The payload decodes but names a different key.
    #[error("artifact stored under {expected} identifies as {found}")]
    KeyMismatch { expected: CacheKey, found: CacheKey },
}
