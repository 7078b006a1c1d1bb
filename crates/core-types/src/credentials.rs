use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::display::mask_secret;
use crate::error::CoreError;

/// A secret as the application holds it in memory.
///
/// `Captured` carries the plaintext the user actually typed. `Redacted` means
/// the secret exists in the persisted set but its plaintext is not available
/// in this process (it was written by an earlier session through a save path
/// that does not echo secrets back). Redacted entries are inert: they are
/// never sent anywhere and never compared against magic strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredSecret {
    Captured(String),
    Redacted,
}

impl StoredSecret {
    /// An empty captured secret, the "nothing entered yet" state.
    pub fn empty() -> Self {
        StoredSecret::Captured(String::new())
    }

    /// The plaintext, when this process holds it.
    pub fn as_captured(&self) -> Option<&str> {
        match self {
            StoredSecret::Captured(value) => Some(value),
            StoredSecret::Redacted => None,
        }
    }

    pub fn is_redacted(&self) -> bool {
        matches!(self, StoredSecret::Redacted)
    }

    /// True when the secret can actually be used for a remote call.
    pub fn is_usable(&self) -> bool {
        match self {
            StoredSecret::Captured(value) => !value.is_empty(),
            StoredSecret::Redacted => false,
        }
    }

    /// Masked rendering for display surfaces. Never exposes the plaintext.
    pub fn display_masked(&self) -> String {
        match self {
            StoredSecret::Captured(value) => mask_secret(value),
            StoredSecret::Redacted => mask_secret(""),
        }
    }
}

/// Which Bybit market categories a connection should trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketSelection {
    pub spot: bool,
    pub usdt_perpetual: bool,
    pub inverse_usd: bool,
}

impl Default for MarketSelection {
    fn default() -> Self {
        Self {
            spot: true,
            usdt_perpetual: true,
            inverse_usd: false,
        }
    }
}

/// One exchange API credential as entered by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionCredential {
    pub id: String,
    pub name: String,
    pub api_key: StoredSecret,
    pub secret_key: StoredSecret,
    pub testnet: bool,
    pub markets: MarketSelection,
    pub created_at: DateTime<Utc>,
    pub last_used: Option<DateTime<Utc>>,
}

impl ConnectionCredential {
    /// Builds a new credential with a freshly minted `conn_<millis>` id, the
    /// id shape the registry keys its sessions on.
    pub fn new(
        name: impl Into<String>,
        api_key: impl Into<String>,
        secret_key: impl Into<String>,
        testnet: bool,
        markets: MarketSelection,
    ) -> Self {
        Self {
            id: format!("conn_{}", Utc::now().timestamp_millis()),
            name: name.into(),
            api_key: StoredSecret::Captured(api_key.into()),
            secret_key: StoredSecret::Captured(secret_key.into()),
            testnet,
            markets,
            created_at: Utc::now(),
            last_used: None,
        }
    }

    /// True when both secrets are present in plaintext and non-empty, i.e.
    /// the record can be replayed against the registry.
    pub fn is_replayable(&self) -> bool {
        self.api_key.is_usable() && self.secret_key.is_usable()
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.name.trim().is_empty() {
            return Err(CoreError::InvalidInput(
                "name".into(),
                "connection name must not be empty".into(),
            ));
        }
        if !self.api_key.is_usable() {
            return Err(CoreError::InvalidInput(
                "apiKey".into(),
                "API key must be entered before saving".into(),
            ));
        }
        if !self.secret_key.is_usable() {
            return Err(CoreError::InvalidInput(
                "secretKey".into(),
                "secret key must be entered before saving".into(),
            ));
        }
        Ok(())
    }
}

/// The single AI-provider credential slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AiCredential {
    pub api_key: StoredSecret,
    pub organization: Option<String>,
}

impl Default for AiCredential {
    fn default() -> Self {
        Self {
            api_key: StoredSecret::empty(),
            organization: None,
        }
    }
}

impl AiCredential {
    pub fn is_present(&self) -> bool {
        self.api_key.is_usable() || self.api_key.is_redacted()
    }
}

/// Everything the vault stores for one user: the exchange connections plus
/// the AI-provider key. This is the decrypted, in-memory rendering; it is
/// never serialized as-is.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CredentialSet {
    pub connections: Vec<ConnectionCredential>,
    pub ai: AiCredential,
}

impl CredentialSet {
    /// The connections the startup reconciler may replay.
    pub fn replayable(&self) -> impl Iterator<Item = &ConnectionCredential> {
        self.connections.iter().filter(|c| c.is_replayable())
    }

    pub fn upsert_connection(&mut self, credential: ConnectionCredential) {
        match self.connections.iter_mut().find(|c| c.id == credential.id) {
            Some(existing) => *existing = credential,
            None => self.connections.push(credential),
        }
    }

    pub fn remove_connection(&mut self, id: &str) -> bool {
        let before = self.connections.len();
        self.connections.retain(|c| c.id != id);
        self.connections.len() != before
    }
}
