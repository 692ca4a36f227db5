//! Deterministic fingerprints using blake3.
//!
//! # Determinism
//!
//! Same content always produces the same fingerprint. This is ensured by:
//! - Using `serde_json::to_vec` for canonical serialization
//! - Ordered maps (`IndexMap`, `Vec`) in every hashed type
//! - Never iterating `HashMap` directly for hash-affecting operations
//!
//! Every fingerprint mixes in [`FORMAT_VERSION`] and a domain tag, so a
//! change to the plan layout invalidates persisted artifacts and a
//! definition hash can never collide with a policy hash.

use dbc_core::{ContractDescriptor, ResolvedPolicy, StructureMetadata};

use crate::error::StorageError;
use crate::types::Fingerprint;

/// Bumped whenever the woven plan layout changes.
pub const FORMAT_VERSION: u32 = 1;

fn hasher(domain: &[u8]) -> blake3::Hasher {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&FORMAT_VERSION.to_le_bytes());
    hasher.update(domain);
    hasher
}

/// Fingerprints a structure definition: its metadata (signatures and
/// annotation text) together with the descriptor parsed from it.
pub fn fingerprint_definition(
    metadata: &StructureMetadata,
    descriptor: &ContractDescriptor,
) -> Result<Fingerprint, StorageError> {
    let mut hasher = hasher(b"definition");
    hasher.update(&serde_json::to_vec(metadata)?);
    hasher.update(&serde_json::to_vec(descriptor)?);
    Ok(hasher.finalize().into())
}

/// Fingerprints a resolved policy.
pub fn fingerprint_policy(policy: &ResolvedPolicy) -> Result<Fingerprint, StorageError> {
    let mut hasher = hasher(b"policy");
    hasher.update(&serde_json::to_vec(policy)?);
    Ok(hasher.finalize().into())
}
