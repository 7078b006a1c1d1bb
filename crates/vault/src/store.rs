use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;

use thiserror::Error;
use tracing::debug;

/// Slot holding the serialized `UserIdentity`.
pub const SLOT_IDENTITY: &str = "identity.json";
/// Slot holding the hex-encoded per-installation derivation salt.
pub const SLOT_SALT: &str = "vault.salt";
/// Slot holding the encrypted credential document.
pub const SLOT_CREDENTIALS: &str = "encrypted_credentials.json";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Storage I/O failure for slot '{slot}': {source}")]
    Io {
        slot: String,
        #[source]
        source: io::Error,
    },
}

/// Minimal persistence surface the vault is written against.
///
/// Slot names are opaque keys owned by the callers; implementations decide
/// how they map to real storage. `set` must publish the new value atomically:
/// a concurrent reader sees either the previous value or the new one, never a
/// torn write.
pub trait KvStore: Send + Sync {
    fn get(&self, slot: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, slot: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&self, slot: &str) -> Result<(), StoreError>;
}

/// File-backed store: one file per slot under a data directory.
///
/// Writes land in a `.tmp` sibling first and are renamed into place, so a
/// slot file on disk is always a complete document.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| StoreError::Io {
            slot: dir.display().to_string(),
            source,
        })?;
        Ok(Self { dir })
    }

    fn slot_path(&self, slot: &str) -> PathBuf {
        self.dir.join(slot)
    }
}

impl KvStore for FileStore {
    fn get(&self, slot: &str) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(self.slot_path(slot)) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Io {
                slot: slot.to_string(),
                source,
            }),
        }
    }

    fn set(&self, slot: &str, value: &str) -> Result<(), StoreError> {
        let path = self.slot_path(slot);
        let tmp = self.dir.join(format!("{slot}.tmp"));
        fs::write(&tmp, value).map_err(|source| StoreError::Io {
            slot: slot.to_string(),
            source,
        })?;
        fs::rename(&tmp, &path).map_err(|source| StoreError::Io {
            slot: slot.to_string(),
            source,
        })?;
        debug!(slot, bytes = value.len(), "slot written");
        Ok(())
    }

    fn remove(&self, slot: &str) -> Result<(), StoreError> {
        match fs::remove_file(self.slot_path(slot)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StoreError::Io {
                slot: slot.to_string(),
                source,
            }),
        }
    }
}

/// In-memory store for tests and ephemeral profiles.
#[derive(Default)]
pub struct MemoryStore {
    slots: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemoryStore {
    fn get(&self, slot: &str) -> Result<Option<String>, StoreError> {
        let slots = self.slots.lock().unwrap_or_else(|p| p.into_inner());
        Ok(slots.get(slot).cloned())
    }

    fn set(&self, slot: &str, value: &str) -> Result<(), StoreError> {
        let mut slots = self.slots.lock().unwrap_or_else(|p| p.into_inner());
        slots.insert(slot.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, slot: &str) -> Result<(), StoreError> {
        let mut slots = self.slots.lock().unwrap_or_else(|p| p.into_inner());
        slots.remove(slot);
        Ok(())
    }
}
