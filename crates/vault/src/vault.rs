use std::sync::Arc;

use chrono::Utc;
use core_types::{AiCredential, ConnectionCredential, CredentialSet, StoredSecret, UserIdentity};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::cipher::VaultCipher;
use crate::error::VaultError;
use crate::kdf;
use crate::records::{
    EncryptedAiCredential, EncryptedConnectionRecord, EncryptedCredentialSet, SECRET_SENTINEL,
    VaultInfo,
};
use crate::store::{KvStore, SLOT_CREDENTIALS};

/// Encrypted credential storage bound to one user identity.
///
/// The caller-facing contract is deliberately blunt: `load` answers "the
/// stored set, or nothing", and absence, corruption, foreign ownership and
/// undecryptable content are all "nothing". `save` and `clear` report plain
/// success flags. The full failure detail goes to the log.
pub struct CredentialVault {
    store: Arc<dyn KvStore>,
    cipher: VaultCipher,
    user_id: Uuid,
}

impl CredentialVault {
    /// Opens the vault for `identity`, deriving the encryption key from the
    /// application passphrase and the installation salt (created on first
    /// open).
    pub fn open(
        store: Arc<dyn KvStore>,
        passphrase: &str,
        identity: &UserIdentity,
    ) -> Result<Self, VaultError> {
        let salt = kdf::load_or_create_salt(store.as_ref())?;
        let key = kdf::derive_key(passphrase, &identity.id, &salt);
        Ok(Self {
            store,
            cipher: VaultCipher::new(key),
            user_id: identity.id,
        })
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    /// Encrypts and persists the whole credential set in one write.
    ///
    /// Returns `false` when anything along the way fails; the previous
    /// document, if any, is left untouched in that case.
    pub fn save(&self, set: &CredentialSet) -> bool {
        match self.try_save(set) {
            Ok(()) => {
                info!(
                    connections = set.connections.len(),
                    "credential set saved"
                );
                true
            }
            Err(e) => {
                warn!("credential save failed: {e}");
                false
            }
        }
    }

    /// The decrypted credential set, or `None` when nothing usable is stored.
    pub fn load(&self) -> Option<CredentialSet> {
        match self.try_load() {
            Ok(set) => set,
            Err(e) => {
                warn!("credential load failed, treating vault as empty: {e}");
                None
            }
        }
    }

    /// Removes the credential document. `true` when the slot is gone.
    pub fn clear(&self) -> bool {
        match self.store.remove(SLOT_CREDENTIALS) {
            Ok(()) => {
                info!("credential set cleared");
                true
            }
            Err(e) => {
                warn!("credential clear failed: {e}");
                false
            }
        }
    }

    /// Whether a credential set owned by the current user is stored.
    /// Metadata only, nothing is decrypted.
    pub fn has_stored(&self) -> bool {
        self.peek_document()
            .map(|doc| doc.user_id == self.user_id)
            .unwrap_or(false)
    }

    /// Summary of the stored document without touching secret material.
    pub fn info(&self) -> VaultInfo {
        let slot_present = matches!(self.store.get(SLOT_CREDENTIALS), Ok(Some(_)));
        match self.peek_document() {
            Some(doc) => VaultInfo {
                slot_present,
                connection_count: doc.bybit_connections.len(),
                has_ai_credential: !doc.openai.api_key.is_empty(),
                last_saved: Some(doc.encrypted_at),
                is_current_user: doc.user_id == self.user_id,
            },
            None => VaultInfo {
                slot_present,
                ..VaultInfo::absent()
            },
        }
    }

    fn try_save(&self, set: &CredentialSet) -> Result<(), VaultError> {
        let document = EncryptedCredentialSet {
            user_id: self.user_id,
            bybit_connections: set
                .connections
                .iter()
                .map(|c| self.seal_connection(c))
                .collect::<Result<Vec<_>, VaultError>>()?,
            openai: EncryptedAiCredential {
                api_key: self.seal_secret(&set.ai.api_key)?,
                organization: set.ai.organization.clone(),
            },
            encrypted_at: Utc::now(),
        };

        let json = serde_json::to_string_pretty(&document)?;
        // One set() call: the document hits the store complete or not at all.
        self.store.set(SLOT_CREDENTIALS, &json)?;
        Ok(())
    }

    fn try_load(&self) -> Result<Option<CredentialSet>, VaultError> {
        let Some(doc) = self.peek_document_checked()? else {
            return Ok(None);
        };
        if doc.user_id != self.user_id {
            return Err(VaultError::OwnershipMismatch);
        }

        let connections = doc
            .bybit_connections
            .into_iter()
            .map(|record| self.unseal_connection(record))
            .collect::<Result<Vec<_>, VaultError>>()?;
        let ai = AiCredential {
            api_key: self.unseal_secret(&doc.openai.api_key)?,
            organization: doc.openai.organization,
        };

        debug!(connections = connections.len(), "credential set loaded");
        Ok(Some(CredentialSet { connections, ai }))
    }

    fn seal_connection(
        &self,
        credential: &ConnectionCredential,
    ) -> Result<EncryptedConnectionRecord, VaultError> {
        Ok(EncryptedConnectionRecord {
            id: credential.id.clone(),
            name: credential.name.clone(),
            api_key: self.seal_secret(&credential.api_key)?,
            secret_key: self.seal_secret(&credential.secret_key)?,
            testnet: credential.testnet,
            markets: credential.markets,
            created_at: credential.created_at,
            last_used: credential.last_used,
        })
    }

    fn unseal_connection(
        &self,
        record: EncryptedConnectionRecord,
    ) -> Result<ConnectionCredential, VaultError> {
        Ok(ConnectionCredential {
            api_key: self.unseal_secret(&record.api_key)?,
            secret_key: self.unseal_secret(&record.secret_key)?,
            id: record.id,
            name: record.name,
            testnet: record.testnet,
            markets: record.markets,
            created_at: record.created_at,
            last_used: record.last_used,
        })
    }

    // The cipher passes empty values through unchanged, so an absent secret
    // persists as an empty field rather than ciphertext of "".
    fn seal_secret(&self, secret: &StoredSecret) -> Result<String, VaultError> {
        match secret {
            StoredSecret::Captured(plain) => Ok(self.cipher.encrypt(plain)?),
            StoredSecret::Redacted => Ok(SECRET_SENTINEL.to_string()),
        }
    }

    fn unseal_secret(&self, stored: &str) -> Result<StoredSecret, VaultError> {
        if stored == SECRET_SENTINEL {
            return Ok(StoredSecret::Redacted);
        }
        Ok(StoredSecret::Captured(self.cipher.decrypt(stored)?))
    }

    /// Best-effort parse of the stored document, used by the metadata reads.
    fn peek_document(&self) -> Option<EncryptedCredentialSet> {
        match self.peek_document_checked() {
            Ok(doc) => doc,
            Err(e) => {
                debug!("credential document unreadable: {e}");
                None
            }
        }
    }

    fn peek_document_checked(&self) -> Result<Option<EncryptedCredentialSet>, VaultError> {
        let Some(raw) = self.store.get(SLOT_CREDENTIALS)? else {
            return Ok(None);
        };
        Ok(Some(serde_json::from_str(&raw)?))
    }
}
