//! Key-value store abstraction
//!
//! Values are strings (usually serialized JSON), the same contract as browser
//! local storage. A missing key is never an error.

use crate::storage::error::{StorageError, StorageResult};
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;

/// Cached dashboard snapshot
pub const CACHED_DATA_KEY: &str = "jaldrishti-cached-data";
/// Pending offline queue
pub const OFFLINE_QUEUE_KEY: &str = "jaldrishti-offline-queue";
/// Selected display theme
pub const THEME_KEY: &str = "jaldrishti-theme";
/// Danger-zone flag ("true" / "false")
pub const DANGER_ZONE_KEY: &str = "jaldrishti-danger-zone";

/// Persistent string storage
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> StorageResult<Option<String>>;

    fn set(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Removing an absent key succeeds
    fn remove(&self, key: &str) -> StorageResult<()>;

    fn contains(&self, key: &str) -> StorageResult<bool> {
        Ok(self.get(key)?.is_some())
    }
}

/// JSON helpers available on every store
pub trait JsonStoreExt: KeyValueStore {
    fn get_json<T: DeserializeOwned>(&self, key: &str) -> StorageResult<Option<T>> {
        match self.get(key)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    fn set_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> StorageResult<()> {
        let raw = serde_json::to_string(value)?;
        self.set(key, &raw)
    }
}

impl<S: KeyValueStore + ?Sized> JsonStoreExt for S {}

/// In-memory store for tests and ephemeral sessions
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let entries = self
            .entries
            .lock()
            .map_err(|e| StorageError::Lock(e.to_string()))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| StorageError::Lock(e.to_string()))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| StorageError::Lock(e.to_string()))?;
        entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Sample {
        name: String,
        level: f64,
    }

    #[test]
    fn test_memory_store_basic_operations() {
        let store = MemoryStore::new();
        assert_eq!(store.get("missing").unwrap(), None);

        store.set(THEME_KEY, "boost").unwrap();
        assert_eq!(store.get(THEME_KEY).unwrap().as_deref(), Some("boost"));
        assert!(store.contains(THEME_KEY).unwrap());

        store.remove(THEME_KEY).unwrap();
        store.remove(THEME_KEY).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_json_helpers() {
        let store = MemoryStore::new();
        let sample = Sample {
            name: "Yamuna".to_string(),
            level: 4.2,
        };

        store.set_json("sample", &sample).unwrap();
        let back: Option<Sample> = store.get_json("sample").unwrap();
        assert_eq!(back, Some(sample));

        store.set("sample", "{not json").unwrap();
        let err = store.get_json::<Sample>("sample").unwrap_err();
        assert!(matches!(err, StorageError::Serialization(_)));
    }

    #[test]
    fn test_json_helpers_on_trait_object() {
        let store: Box<dyn KeyValueStore> = Box::new(MemoryStore::new());
        store.set_json("values", &vec![1, 2, 3]).unwrap();
        let values: Option<Vec<i32>> = store.get_json("values").unwrap();
        assert_eq!(values, Some(vec![1, 2, 3]));
    }
}
