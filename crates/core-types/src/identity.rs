use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The local user profile that owns everything persisted on this device.
///
/// The `id` is minted once per installation and never changes afterwards;
/// encrypted credential sets are bound to it. `name` and `email` are display
/// fields and may be edited freely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserIdentity {
    pub id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl UserIdentity {
    /// Mints a fresh identity with a random id.
    pub fn generate(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            email: None,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_identities_are_distinct() {
        let a = UserIdentity::generate("Trader");
        let b = UserIdentity::generate("Trader");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn serializes_camel_case() {
        let identity = UserIdentity::generate("Trader");
        let json = serde_json::to_value(&identity).unwrap();
        assert!(json.get("createdAt").is_some());
        assert!(json.get("created_at").is_none());
    }
}
