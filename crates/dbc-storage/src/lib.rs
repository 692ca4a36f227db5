//! Persistence for woven contract plans.
//!
//! Provides content fingerprints and the [`CacheKey`] built from them, the
//! [`ArtifactStore`] trait every backend implements, and two backends:
//! [`InMemoryArtifactStore`] and [`SqliteArtifactStore`].
//!
//! Stores hold serialized payloads only. Decoding them back into plans, and
//! deciding what to do when that fails, is the definition cache's job; the
//! [`decode_artifact`] helper reports failures as [`CacheCorruptionError`].
//!
//! # Modules
//!
//! - [`error`]: StorageError and CacheCorruptionError
//! - [`types`]: Fingerprint and CacheKey
//! - [`hash`]: blake3 fingerprints over canonical JSON
//! - [`traits`]: ArtifactStore trait definition
//! - [`memory`]: InMemoryArtifactStore implementation
//! - [`schema`]: migration setup for the SQLite backend
//! - [`sqlite`]: SqliteArtifactStore implementation

pub mod error;
pub mod hash;
pub mod memory;
pub mod schema;
pub mod sqlite;
pub mod traits;
pub mod types;

pub use error::{CacheCorruptionError, StorageError};
pub use hash::{fingerprint_definition, fingerprint_policy, FORMAT_VERSION};
pub use memory::InMemoryArtifactStore;
pub use sqlite::SqliteArtifactStore;
pub use traits::{decode_artifact, encode_artifact, ArtifactStore};
pub use types::{CacheKey, Fingerprint};
