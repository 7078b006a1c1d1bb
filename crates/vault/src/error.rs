use thiserror::Error;

use crate::cipher::CipherError;
use crate::store::StoreError;

/// Internal failure taxonomy of the vault.
///
/// None of these escape the credential API: `save`/`clear` report `bool`,
/// `load` reports `Option`, and the distinctions below survive only in logs.
/// Constructors and the identity store do propagate them, since a broken
/// storage directory is an environment problem the caller must see.
#[derive(Error, Debug)]
pub enum VaultError {
    #[error("storage failure: {0}")]
    Store(#[from] StoreError),

    #[error("cipher failure: {0}")]
    Cipher(#[from] CipherError),

    #[error("credential document malformed: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("credential set belongs to a different user")]
    OwnershipMismatch,
}
