//! SQLite implementation of [`ArtifactStore`].
//!
//! [`SqliteArtifactStore`] keeps woven plans across process restarts so a
//! production host can skip weaving entirely on warm starts. Payloads are
//! stored as JSON TEXT in the `woven_artifacts` table, keyed by the three
//! parts of the [`CacheKey`].

use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::StorageError;
use crate::traits::ArtifactStore;
use crate::types::{CacheKey, Fingerprint};

/// SQLite-backed implementation of [`ArtifactStore`].
///
/// The connection sits behind a mutex; SQLite serializes writers anyway.
pub struct SqliteArtifactStore {
    conn: Mutex<Connection>,
}

impl SqliteArtifactStore {
    /// Opens (or creates) a SQLite database at `path`.
    pub fn new(path: &str) -> Result<Self, StorageError> {
        let conn = crate::schema::open_database(path)?;
        Ok(SqliteArtifactStore { conn: Mutex::new(conn) })
    }

    /// Opens an in-memory SQLite database (for testing).
    pub fn in_memory() -> Result<Self, StorageError> {
        let conn = crate::schema::open_in_memory()?;
        Ok(SqliteArtifactStore { conn: Mutex::new(conn) })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StorageError> {
        self.conn.lock().map_err(|_| StorageError::LockPoisoned)
    }

    /// Removes every artifact stored for `structure_id`, whatever its
    /// fingerprints. Returns the number of rows removed.
    pub fn purge_structure(&self, structure_id: &str) -> Result<usize, StorageError> {
        let conn = self.conn()?;
        let removed = conn.execute(
            "DELETE FROM woven_artifacts WHERE structure_id = ?1",
            params![structure_id],
        )?;
        Ok(removed)
    }
}

impl ArtifactStore for SqliteArtifactStore {
    fn load(&self, key: &CacheKey) -> Result<Option<String>, StorageError> {
        let conn = self.conn()?;
        let payload = conn
            .query_row(
                "SELECT payload FROM woven_artifacts
                 WHERE structure_id = ?1 AND definition_fingerprint = ?2 AND policy_fingerprint = ?3",
                params![key.structure_id.as_str(), key.definition.to_hex(), key.policy.to_hex()],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(payload)
    }

    fn save(&self, key: &CacheKey, payload: &str) -> Result<(), StorageError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO woven_artifacts (structure_id, definition_fingerprint, policy_fingerprint, payload)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (structure_id, definition_fingerprint, policy_fingerprint)
             DO UPDATE SET payload = excluded.payload, stored_at = strftime('%s', 'now')",
            params![
                key.structure_id.as_str(),
                key.definition.to_hex(),
                key.policy.to_hex(),
                payload
            ],
        )?;
        Ok(())
    }

    fn remove(&self, key: &CacheKey) -> Result<bool, StorageError> {
        let conn = self.conn()?;
        let removed = conn.execute(
            "DELETE FROM woven_artifacts
             WHERE structure_id = ?1 AND definition_fingerprint = ?2 AND policy_fingerprint = ?3",
            params![key.structure_id.as_str(), key.definition.to_hex(), key.policy.to_hex()],
        )?;
        Ok(removed > 0)
    }

    fn keys(&self) -> Result<Vec<CacheKey>, StorageError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT structure_id, definition_fingerprint, policy_fingerprint
             FROM woven_artifacts ORDER BY structure_id, stored_at",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;

        let mut keys = Vec::new();
        for row in rows {
            let (structure_id, definition, policy) = row?;
            let parse = |hex: &str| {
                Fingerprint::from_hex(hex).map_err(|reason| StorageError::IntegrityError { reason })
            };
            keys.push(CacheKey {
                structure_id: structure_id.into(),
                definition: parse(&definition)?,
                policy: parse(&policy)?,
            });
        }
        Ok(keys)
    }
}
