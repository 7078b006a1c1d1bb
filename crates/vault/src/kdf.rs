use pbkdf2::pbkdf2_hmac_array;
use rand::{RngCore, rngs::OsRng};
use sha2::Sha256;
use tracing::warn;
use uuid::Uuid;

use crate::error::VaultError;
use crate::store::{KvStore, SLOT_SALT};

/// PBKDF2 round count. Matches the shipped backend so keys derived by either
/// side agree.
pub const PBKDF2_ITERATIONS: u32 = 100_000;
pub const SALT_LEN: usize = 16;

/// Derives the 256-bit vault key from the application passphrase, the owning
/// user id and the per-installation salt.
///
/// Deterministic: the same three inputs always yield the same key, which is
/// what lets a restarted process read its own ciphertext. Losing the salt
/// loses every prior ciphertext with it.
pub fn derive_key(passphrase: &str, user_id: &Uuid, salt: &[u8]) -> [u8; 32] {
    let material = format!("{passphrase}:{user_id}");
    pbkdf2_hmac_array::<Sha256, 32>(material.as_bytes(), salt, PBKDF2_ITERATIONS)
}

/// Returns the installation salt, minting and persisting one on first use.
///
/// A salt slot that fails to parse is replaced with a fresh salt; ciphertext
/// written under the old salt becomes unreadable, which downstream code
/// already treats as "no stored credentials".
pub fn load_or_create_salt(store: &dyn KvStore) -> Result<[u8; SALT_LEN], VaultError> {
    if let Some(encoded) = store.get(SLOT_SALT)? {
        match hex::decode(encoded.trim()) {
            Ok(bytes) if bytes.len() == SALT_LEN => {
                let mut salt = [0u8; SALT_LEN];
                salt.copy_from_slice(&bytes);
                return Ok(salt);
            }
            _ => warn!("salt slot unreadable, generating a replacement"),
        }
    }

    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    store.set(SLOT_SALT, &hex::encode(salt))?;
    Ok(salt)
}
