use std::sync::Arc;

use core_types::UserIdentity;
use tracing::{info, warn};

use crate::error::VaultError;
use crate::store::{KvStore, SLOT_IDENTITY};

const DEFAULT_PROFILE_NAME: &str = "Trader";

/// Reads and writes the installation's `UserIdentity` slot.
pub struct IdentityStore {
    store: Arc<dyn KvStore>,
}

impl IdentityStore {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    /// The current identity, minting and persisting one on first access.
    ///
    /// An unreadable identity slot is replaced with a fresh identity; the
    /// old id is gone, so any credential set bound to it will be treated as
    /// foreign from now on.
    pub fn current(&self) -> Result<UserIdentity, VaultError> {
        if let Some(raw) = self.store.get(SLOT_IDENTITY)? {
            match serde_json::from_str::<UserIdentity>(&raw) {
                Ok(identity) => return Ok(identity),
                Err(e) => warn!("identity slot unreadable, minting a new identity: {e}"),
            }
        }

        let identity = UserIdentity::generate(DEFAULT_PROFILE_NAME);
        self.persist(&identity)?;
        info!(user_id = %identity.id, "created new local identity");
        Ok(identity)
    }

    /// Updates the mutable display fields. The id never changes.
    pub fn update_profile(
        &self,
        name: impl Into<String>,
        email: Option<String>,
    ) -> Result<UserIdentity, VaultError> {
        let mut identity = self.current()?;
        identity.name = name.into();
        identity.email = email;
        self.persist(&identity)?;
        Ok(identity)
    }

    fn persist(&self, identity: &UserIdentity) -> Result<(), VaultError> {
        let json = serde_json::to_string_pretty(identity)?;
        self.store.set(SLOT_IDENTITY, &json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn identity_is_stable_across_reads() {
        let store = Arc::new(MemoryStore::new());
        let identities = IdentityStore::new(store);
        let first = identities.current().unwrap();
        let second = identities.current().unwrap();
        assert_eq!(first.id, second.id);
    }

    #[test]
    fn profile_update_keeps_the_id() {
        let store = Arc::new(MemoryStore::new());
        let identities = IdentityStore::new(store);
        let original = identities.current().unwrap();
        let updated = identities
            .update_profile("Ava", Some("ava@example.com".into()))
            .unwrap();
        assert_eq!(updated.id, original.id);
        assert_eq!(updated.name, "Ava");
        assert_eq!(updated.email.as_deref(), Some("ava@example.com"));
    }

    #[test]
    fn corrupt_identity_slot_is_replaced() {
        let store = Arc::new(MemoryStore::new());
        store.set(SLOT_IDENTITY, "{broken").unwrap();
        let identities = IdentityStore::new(store);
        let identity = identities.current().unwrap();
        assert_eq!(identity.name, DEFAULT_PROFILE_NAME);
    }
}
