//! Credential persistence behind an opaque key-value capability.

use std::collections::HashMap;
use std::sync::RwLock;

use omnidisk_common::Result;

/// Storage key for the Google Drive credential.
pub const GOOGLE_DRIVE_TOKEN_KEY: &str = "GoogleDriveTokenKey";
/// Storage key for the Yandex Disk credential.
pub const YANDEX_DISK_TOKEN_KEY: &str = "YandexDiskTokenKey";

/// Opaque key-value persistence capability.
///
/// The production implementation (a keychain-style secure store or a plain
/// preference store) is an external collaborator; this crate only depends on
/// the capability. The store is shared but unsynchronized: last write wins.
pub trait KeyValueStore: Send + Sync {
    /// Read a value, `None` when the key is absent.
    fn get(&self, key: &str) -> Result<Option<String>>;
    /// Write a value.
    fn set(&self, key: &str, value: &str) -> Result<()>;
    /// Remove a value; removing an absent key is not an error.
    fn remove(&self, key: &str) -> Result<()>;
}

/// Backend-scoped token access: one fixed key into a key-value store.
pub trait TokenStore: Send + Sync {
    /// The currently stored token, if any.
    fn token(&self) -> Option<String>;
    /// Persist a token.
    fn save_token(&self, token: &str) -> Result<()>;
    /// Drop the stored token (sign-out).
    fn remove_token(&self) -> Result<()>;
}

/// `TokenStore` backed by a fixed key in a `KeyValueStore`.
pub struct StoredToken {
    key: String,
    store: std::sync::Arc<dyn KeyValueStore>,
}

impl StoredToken {
    pub fn new(key: impl Into<String>, store: std::sync::Arc<dyn KeyValueStore>) -> Self {
        Self {
            key: key.into(),
            store,
        }
    }
}

impl TokenStore for StoredToken {
    fn token(&self) -> Option<String> {
        self.store.get(&self.key).ok().flatten()
    }

    fn save_token(&self, token: &str) -> Result<()> {
        self.store.set(&self.key, token)
    }

    fn remove_token(&self) -> Result<()> {
        self.store.remove(&self.key)
    }
}

/// In-memory key-value store.
///
/// Useful for tests and for wiring before a persistent store is available.
/// All data is lost on drop.
#[derive(Default)]
pub struct MemoryKeyValueStore {
    values: RwLock<HashMap<String, String>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.read().unwrap().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.values
            .write()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.values.write().unwrap().remove(key);
        Ok(())
    }
}
