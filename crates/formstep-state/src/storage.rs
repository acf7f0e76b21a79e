//! Persistence through an injected string key-value store.
//!
//! The engine persists the whole resolved document as JSON under a single
//! configurable key. The store is always provided explicitly; "use an
//! ambient platform store" decisions belong to the integration layer.

use crate::error::{FormError, FormResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// The storage key used when none is configured.
pub const DEFAULT_STORAGE_KEY: &str = "formstep";

/// A synchronous string key-value store.
///
/// Mirrors the `getItem`/`setItem`/`removeItem` shape of platform storage.
pub trait KeyValueStore: Send + Sync {
    /// Read the stored string for a key, if any.
    fn get_item(&self, key: &str) -> FormResult<Option<String>>;
    /// Write the string for a key.
    fn set_item(&self, key: &str, value: &str) -> FormResult<()>;
    /// Remove a key.
    fn remove_item(&self, key: &str) -> FormResult<()>;
}

/// In-memory [`KeyValueStore`] for tests and non-browser hosts.
#[derive(Debug, Default)]
pub struct MemoryStore {
    items: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get_item(&self, key: &str) -> FormResult<Option<String>> {
        let items = self
            .items
            .lock()
            .map_err(|_| FormError::storage("memory store mutex poisoned"))?;
        Ok(items.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> FormResult<()> {
        let mut items = self
            .items
            .lock()
            .map_err(|_| FormError::storage("memory store mutex poisoned"))?;
        items.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> FormResult<()> {
        let mut items = self
            .items
            .lock()
            .map_err(|_| FormError::storage("memory store mutex poisoned"))?;
        items.remove(key);
        Ok(())
    }
}

/// JSON round-trip adapter over a [`KeyValueStore`], bound to one key.
///
/// The adapter does not validate schema shape; it only serializes values to
/// strings and back.
#[derive(Clone)]
pub struct StorageAdapter {
    store: Arc<dyn KeyValueStore>,
    key: String,
}

impl StorageAdapter {
    /// Bind a store to a key.
    pub fn new(store: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    /// The bound key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Read and deserialize the stored value, if any.
    pub fn get<T: DeserializeOwned>(&self) -> FormResult<Option<T>> {
        match self.store.get_item(&self.key)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Serialize and store a value.
    pub fn set<T: Serialize>(&self, value: &T) -> FormResult<()> {
        let raw = serde_json::to_string(value)?;
        self.store.set_item(&self.key, &raw)
    }

    /// Store the result of applying `f` to the currently stored value.
    pub fn update<T: Serialize + DeserializeOwned>(
        &self,
        f: impl FnOnce(Option<T>) -> T,
    ) -> FormResult<()> {
        let current = self.get()?;
        self.set(&f(current))
    }

    /// Remove the stored value.
    pub fn remove(&self) -> FormResult<()> {
        self.store.remove_item(&self.key)
    }
}

impl std::fmt::Debug for StorageAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageAdapter")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn adapter() -> StorageAdapter {
        StorageAdapter::new(Arc::new(MemoryStore::new()), "test-key")
    }

    #[test]
    fn test_get_missing_is_none() {
        let storage = adapter();
        assert_eq!(storage.get::<Value>().unwrap(), None);
    }

    #[test]
    fn test_set_get_roundtrip() {
        let storage = adapter();
        storage.set(&json!({"step1": {"title": "S"}})).unwrap();
        let got: Value = storage.get().unwrap().unwrap();
        assert_eq!(got["step1"]["title"], "S");
    }

    #[test]
    fn test_update_reads_current_first() {
        let storage = adapter();
        storage.set(&json!({"count": 1})).unwrap();
        storage
            .update::<Value>(|current| {
                let count = current
                    .as_ref()
                    .and_then(|v| v["count"].as_i64())
                    .unwrap_or(0);
                json!({"count": count + 1})
            })
            .unwrap();
        let got: Value = storage.get().unwrap().unwrap();
        assert_eq!(got["count"], 2);
    }

    #[test]
    fn test_remove() {
        let storage = adapter();
        storage.set(&json!(1)).unwrap();
        storage.remove().unwrap();
        assert_eq!(storage.get::<Value>().unwrap(), None);
    }

    #[test]
    fn test_shared_store_different_keys() {
        let store = Arc::new(MemoryStore::new());
        let a = StorageAdapter::new(store.clone(), "a");
        let b = StorageAdapter::new(store, "b");
        a.set(&json!("from-a")).unwrap();
        assert_eq!(b.get::<Value>().unwrap(), None);
    }

    #[test]
    fn test_corrupt_payload_is_serialization_error() {
        let store = Arc::new(MemoryStore::new());
        store.set_item("k", "not json").unwrap();
        let storage = StorageAdapter::new(store, "k");
        assert!(matches!(
            storage.get::<Value>(),
            Err(FormError::Serialization(_))
        ));
    }
}
