//! Ephemeral key-value backend.
//!
//! # Invariants
//! - Always available; used as default and as fallback.
//! - One fixed key per logical collection.
//! - Values are stored as compact JSON strings.

use super::{BackendKind, Collection, PersistenceAdapter, SaveOutcome, StorageError, StorageResult};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

const KEY_PREFIX: &str = "peoplekeep_";

/// Shared string map scoped to one profile.
///
/// Clones share the same entries, so a second store opened on a clone sees
/// what the first one saved.
#[derive(Debug, Clone, Default)]
pub struct KeyValueStore {
    entries: Arc<Mutex<BTreeMap<String, String>>>,
}

impl KeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.lock().get(key).cloned()
    }

    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        self.lock().insert(key.into(), value.into());
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, String>> {
        // A poisoned map still holds complete string entries.
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Fixed storage key of one collection.
pub fn key_for(collection: Collection) -> String {
    format!("{KEY_PREFIX}{}", collection.as_str())
}

/// Key-value backed persistence adapter.
#[derive(Debug, Clone)]
pub struct KeyValueAdapter {
    store: KeyValueStore,
}

impl KeyValueAdapter {
    pub fn new(store: KeyValueStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &KeyValueStore {
        &self.store
    }
}

impl PersistenceAdapter for KeyValueAdapter {
    fn kind(&self) -> BackendKind {
        BackendKind::KeyValue
    }

    fn load(&self, collection: Collection) -> StorageResult<Option<Value>> {
        let Some(raw) = self.store.get(&key_for(collection)) else {
            return Ok(None);
        };

        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|err| StorageError::Decode {
                collection,
                message: err.to_string(),
            })
    }

    fn save(&mut self, collection: Collection, value: &Value) -> StorageResult<SaveOutcome> {
        let encoded = serde_json::to_string(value).map_err(StorageError::Encode)?;
        let key = key_for(collection);
        if self.store.get(&key).as_deref() == Some(encoded.as_str()) {
            return Ok(SaveOutcome::Unchanged);
        }

        self.store.set(key, encoded);
        Ok(SaveOutcome::Written { records: 1 })
    }
}

#[cfg(test)]
mod tests {
    use super::{key_for, KeyValueAdapter, KeyValueStore};
    use crate::storage::{Collection, PersistenceAdapter, SaveOutcome, StorageError};
    use serde_json::json;

    #[test]
    fn save_then_load_through_shared_store() {
        let store = KeyValueStore::new();
        let mut writer = KeyValueAdapter::new(store.clone());
        let reader = KeyValueAdapter::new(store);

        let value = json!([{ "id": "f1", "name": "Job", "type": "text" }]);
        assert_eq!(
            writer.save(Collection::CustomFields, &value).unwrap(),
            SaveOutcome::Written { records: 1 }
        );
        assert_eq!(
            writer.save(Collection::CustomFields, &value).unwrap(),
            SaveOutcome::Unchanged
        );
        assert_eq!(reader.load(Collection::CustomFields).unwrap(), Some(value));
        assert_eq!(reader.load(Collection::People).unwrap(), None);
    }

    #[test]
    fn malformed_json_reports_decode_error() {
        let store = KeyValueStore::new();
        store.set(key_for(Collection::People), "{not json");
        let adapter = KeyValueAdapter::new(store);

        let err = adapter.load(Collection::People).unwrap_err();
        assert!(matches!(
            err,
            StorageError::Decode {
                collection: Collection::People,
                ..
            }
        ));
    }

    #[test]
    fn keys_are_prefixed_per_collection() {
        assert_eq!(key_for(Collection::People), "peoplekeep_people");
        assert_eq!(
            key_for(Collection::FieldRequirements),
            "peoplekeep_field_requirements"
        );
    }
}
