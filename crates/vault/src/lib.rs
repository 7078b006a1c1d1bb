//! # Vantage Vault
//!
//! Encrypted, user-bound credential storage for the dashboard.
//!
//! ## Architectural Principles
//!
//! 1.  **Injectable Persistence**: everything goes through the [`KvStore`]
//!     trait; production uses the file-backed store, tests use memory.
//! 2.  **Fail Closed, Degrade Open**: cryptographic and parse failures never
//!     panic and never surface secrets; the caller simply sees an empty
//!     vault.
//! 3.  **One Document**: the credential set is a single atomic unit. There
//!     are no partial updates to reason about.
//!
//! ## Key Management
//!
//! Keys are derived with PBKDF2-HMAC-SHA256 from the application passphrase,
//! the owning user id and a random per-installation salt. The passphrase
//! ships with the application (see the configuration crate), so the cipher
//! protects against file inspection and cross-user copying, not against an
//! attacker holding both the salt slot and the binary.

pub mod cipher;
pub mod error;
pub mod identity;
pub mod kdf;
pub mod records;
pub mod store;
#[allow(clippy::module_inception)]
pub mod vault;

// Re-export the core types to provide a clean public API.
pub use cipher::{CipherError, VaultCipher};
pub use error::VaultError;
pub use identity::IdentityStore;
pub use records::{SECRET_SENTINEL, VaultInfo};
pub use store::{
    FileStore, KvStore, MemoryStore, SLOT_CREDENTIALS, SLOT_IDENTITY, SLOT_SALT, StoreError,
};
pub use vault::CredentialVault;
