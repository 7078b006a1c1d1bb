use aes_gcm::{
    Aes256Gcm, Key, Nonce,
    aead::{Aead, KeyInit},
};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use rand::{RngCore, rngs::OsRng};
use thiserror::Error;
use zeroize::Zeroizing;

/// Framing prefix for encrypted values at rest: `ENC:v1:<nonce>:<ciphertext>`.
const STORAGE_PREFIX: &str = "ENC:v1:";
const STORAGE_DELIMITER: &str = ":";
const NONCE_LEN: usize = 12;

#[derive(Error, Debug)]
pub enum CipherError {
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),
    #[error("Decryption failed")]
    DecryptionFailed,
    #[error("Invalid storage format")]
    InvalidStorageFormat,
    #[error("Decrypted bytes are not valid UTF-8")]
    InvalidUtf8,
}

/// AES-256-GCM cipher over string values with self-describing framing.
///
/// The key is wiped from memory when the cipher is dropped.
pub struct VaultCipher {
    key: Zeroizing<[u8; 32]>,
}

impl VaultCipher {
    pub fn new(key: [u8; 32]) -> Self {
        Self {
            key: Zeroizing::new(key),
        }
    }

    /// True when `value` carries the storage framing of an encrypted value.
    pub fn is_encrypted_value(value: &str) -> bool {
        value.starts_with(STORAGE_PREFIX)
    }

    /// Encrypts a plaintext into the storage framing.
    ///
    /// Empty input stays empty and already-framed input passes through
    /// unchanged, so re-saving a loaded document is idempotent.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, CipherError> {
        if plaintext.is_empty() {
            return Ok(String::new());
        }
        if Self::is_encrypted_value(plaintext) {
            return Ok(plaintext.to_string());
        }

        let key = Key::<Aes256Gcm>::from_slice(self.key.as_ref());
        let cipher = Aes256Gcm::new(key);

        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|e| CipherError::EncryptionFailed(e.to_string()))?;

        Ok(format!(
            "{}{}{}{}",
            STORAGE_PREFIX,
            STANDARD.encode(nonce_bytes),
            STORAGE_DELIMITER,
            STANDARD.encode(ciphertext)
        ))
    }

    /// Decrypts a framed value back into its plaintext.
    ///
    /// Every failure mode (missing frame, undecodable parts, wrong key,
    /// tampered ciphertext, non-UTF-8 plaintext) is an error value; this
    /// function never panics on hostile input.
    pub fn decrypt(&self, stored: &str) -> Result<String, CipherError> {
        if stored.is_empty() {
            return Ok(String::new());
        }
        let payload = stored
            .strip_prefix(STORAGE_PREFIX)
            .ok_or(CipherError::InvalidStorageFormat)?;

        let parts: Vec<&str> = payload.splitn(2, STORAGE_DELIMITER).collect();
        if parts.len() != 2 {
            return Err(CipherError::InvalidStorageFormat);
        }

        let nonce_bytes = STANDARD
            .decode(parts[0])
            .map_err(|_| CipherError::InvalidStorageFormat)?;
        let ciphertext = STANDARD
            .decode(parts[1])
            .map_err(|_| CipherError::InvalidStorageFormat)?;
        if nonce_bytes.len() != NONCE_LEN {
            return Err(CipherError::InvalidStorageFormat);
        }

        let key = Key::<Aes256Gcm>::from_slice(self.key.as_ref());
        let cipher = Aes256Gcm::new(key);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let plaintext = cipher
            .decrypt(nonce, ciphertext.as_slice())
            .map_err(|_| CipherError::DecryptionFailed)?;

        String::from_utf8(plaintext).map_err(|_| CipherError::InvalidUtf8)
    }
}
