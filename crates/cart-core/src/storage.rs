//! # Storage Port
//!
//! Key-value port the cart and session cache persist through.
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │              KeyValueStore (trait)            │
//! │  ├── get(key)        -> Option<String>        │
//! │  ├── set(key, value)                          │
//! │  ├── remove(key)                              │
//! │  └── keys()          -> Vec<String>           │
//! └───────────────────────────────────────────────┘
//!                        ▲
//!          ┌─────────────┴─────────────┐
//!  ┌───────┴───────┐           ┌───────┴────────┐
//!  │  MemoryStore  │           │ BrowserStorage │
//!  │  (service)    │           │  (cart-wasm)   │
//!  └───────────────┘           └────────────────┘
//! ```
//!
//! Methods take `&self`: a store is a handle onto a shared storage scope,
//! not an owner of private state. There is no `Send + Sync` bound because
//! browser storage handles are neither.

use crate::error::{StorageError, StorageResult};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

/// Synchronous string key-value storage
pub trait KeyValueStore {
    /// Read a value. `Ok(None)` when the key is absent.
    fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Write a value, replacing any existing one.
    fn set(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Remove a key. Removing an absent key is not an error.
    fn remove(&self, key: &str) -> StorageResult<()>;

    /// List every key in the storage scope.
    fn keys(&self) -> StorageResult<Vec<String>>;

    /// List the keys starting with `prefix`.
    fn keys_with_prefix(&self, prefix: &str) -> StorageResult<Vec<String>> {
        Ok(self
            .keys()?
            .into_iter()
            .filter(|k| k.starts_with(prefix))
            .collect())
    }
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for &S {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        (**self).remove(key)
    }

    fn keys(&self) -> StorageResult<Vec<String>> {
        (**self).keys()
    }
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for Arc<S> {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        (**self).remove(key)
    }

    fn keys(&self) -> StorageResult<Vec<String>> {
        (**self).keys()
    }
}

/// In-memory store. Clones share the same underlying map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<RwLock<BTreeMap<String, String>>>,
    /// Maximum number of keys; `None` means unbounded
    capacity: Option<usize>,
}

impl MemoryStore {
    /// Create an empty, unbounded store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that rejects writes of new keys beyond `capacity`
    /// with `StorageError::QuotaExceeded`, like a full browser storage area.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Arc::default(),
            capacity: Some(capacity),
        }
    }

    /// Number of stored keys
    pub fn len(&self) -> usize {
        self.entries.read().map(|m| m.len()).unwrap_or(0)
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn poisoned() -> StorageError {
        StorageError::Backend("memory store lock poisoned".to_string())
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let map = self.entries.read().map_err(|_| Self::poisoned())?;
        Ok(map.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let mut map = self.entries.write().map_err(|_| Self::poisoned())?;
        if let Some(cap) = self.capacity {
            if !map.contains_key(key) && map.len() >= cap {
                return Err(StorageError::QuotaExceeded);
            }
        }
        map.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        let mut map = self.entries.write().map_err(|_| Self::poisoned())?;
        map.remove(key);
        Ok(())
    }

    fn keys(&self) -> StorageResult<Vec<String>> {
        let map = self.entries.read().map_err(|_| Self::poisoned())?;
        Ok(map.keys().cloned().collect())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Store whose every operation fails, for degradation tests
    #[derive(Debug, Default)]
    pub struct FailingStore;

    impl KeyValueStore for FailingStore {
        fn get(&self, _key: &str) -> StorageResult<Option<String>> {
            Err(StorageError::AccessDenied("test".into()))
        }

        fn set(&self, _key: &str, _value: &str) -> StorageResult<()> {
            Err(StorageError::QuotaExceeded)
        }

        fn remove(&self, _key: &str) -> StorageResult<()> {
            Err(StorageError::AccessDenied("test".into()))
        }

        fn keys(&self) -> StorageResult<Vec<String>> {
            Err(StorageError::Unavailable("test".into()))
        }
    }
}
