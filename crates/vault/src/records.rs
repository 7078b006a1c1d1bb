use chrono::{DateTime, Utc};
use core_types::MarketSelection;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Literal written in place of a secret whose plaintext was not available at
/// save time. Exists only in the persisted document; in memory the state is
/// `StoredSecret::Redacted`.
pub const SECRET_SENTINEL: &str = "stored_encrypted";

/// One connection as it sits on disk. Secret fields hold either framed
/// ciphertext or [`SECRET_SENTINEL`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedConnectionRecord {
    pub id: String,
    pub name: String,
    pub api_key: String,
    pub secret_key: String,
    pub testnet: bool,
    #[serde(default)]
    pub markets: MarketSelection,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub last_used: Option<DateTime<Utc>>,
}

/// The persisted AI-provider slot. An empty `api_key` means nothing stored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedAiCredential {
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub organization: Option<String>,
}

/// The single credential document the vault reads and writes.
///
/// `user_id` binds the document to the identity that wrote it; a document
/// owned by someone else is never decrypted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedCredentialSet {
    pub user_id: Uuid,
    #[serde(default)]
    pub bybit_connections: Vec<EncryptedConnectionRecord>,
    #[serde(default)]
    pub openai: EncryptedAiCredential,
    pub encrypted_at: DateTime<Utc>,
}

/// Metadata about the vault's contents, computed without touching any
/// secret material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultInfo {
    /// Whether the credential slot holds anything at all.
    pub slot_present: bool,
    pub connection_count: usize,
    pub has_ai_credential: bool,
    pub last_saved: Option<DateTime<Utc>>,
    /// False when the slot belongs to a different identity (or is unreadable).
    pub is_current_user: bool,
}

impl VaultInfo {
    pub fn absent() -> Self {
        Self {
            slot_present: false,
            connection_count: 0,
            has_ai_credential: false,
            last_saved: None,
            is_current_user: false,
        }
    }
}
