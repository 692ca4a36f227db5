use thiserror::Error;

use dbc_core::MalformedContractError;
use dbc_storage::StorageError;

/// Errors from loading a structure through the engine.
#[derive(Debug, Error)]
pub enum WeaveError {
    /// The structure's contracts are malformed. Always surfaced at load.
    #[error(transparent)]
    Malformed(#[from] MalformedContractError),

    /// The definition or policy could not be fingerprinted.
    #[error("failed to fingerprint definition: {0}")]
    Fingerprint(#[from] StorageError),
}
