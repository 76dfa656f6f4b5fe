//! Durable key/value storage.
//!
//! The runner only needs a mapping from string keys to JSON values that survives
//! process restarts. [`KeyValueStore`] is that port; [`JsonFileStore`] backs it
//! with a single JSON document on disk and [`MemoryStore`] keeps it in memory.

mod file;

pub use file::JsonFileStore;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::errors::StoreError;

/// Key holding the [`remarker_common::RunState`] record.
pub const STATE_KEY: &str = "commentingState";
/// Keys holding the three outcome sequences.
pub const SUCCESSFUL_KEY: &str = "successfulComments";
pub const SKIPPED_KEY: &str = "skippedPosts";
pub const FAILED_KEY: &str = "failedComments";

/// Read-modify-write callback used by [`KeyValueStore::update`].
///
/// Receives the current value and returns the value to store, or `None` to leave
/// the key untouched.
pub type UpdateFn<'a> = dyn FnMut(Option<Value>) -> Result<Option<Value>, StoreError> + 'a;

/// Multi-key callback used by [`KeyValueStore::update_many`].
///
/// Receives the current values in the order the keys were given and returns one
/// entry per key: the value to store, or `None` to leave that key untouched.
pub type UpdateManyFn<'a> =
    dyn FnMut(Vec<Option<Value>>) -> Result<Vec<Option<Value>>, StoreError> + 'a;

pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;

    fn set(&self, key: &str, value: Value) -> Result<(), StoreError>;

    /// Atomically transform the values under `keys`.
    ///
    /// Either every returned value is written or none is, and no other writer may
    /// interleave between the read and the write.
    fn update_many(&self, keys: &[&str], f: &mut UpdateManyFn<'_>) -> Result<(), StoreError>;

    /// Atomically transform the value under `key`.
    fn update(&self, key: &str, f: &mut UpdateFn<'_>) -> Result<(), StoreError> {
        self.update_many(&[key], &mut |mut values| {
            let current = values.pop().flatten();
            Ok(vec![f(current)?])
        })
    }
}

/// Pair `keys` with the values produced for them, rejecting a callback that
/// returned the wrong number of entries.
pub(crate) fn zip_updates<'k>(
    keys: &[&'k str],
    updates: Vec<Option<Value>>,
) -> Result<Vec<(&'k str, Value)>, StoreError> {
    if updates.len() != keys.len() {
        return Err(StoreError::UpdateShape {
            expected: keys.len(),
            got: updates.len(),
        });
    }
    Ok(keys
        .iter()
        .zip(updates)
        .filter_map(|(key, value)| value.map(|v| (*key, v)))
        .collect())
}

/// Read and decode the value under `key`.
pub fn read<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: &str,
) -> Result<Option<T>, StoreError> {
    store
        .get(key)?
        .map(|value| decode(key, value))
        .transpose()
}

/// Encode and write `value` under `key`.
pub fn write<T: Serialize>(store: &dyn KeyValueStore, key: &str, value: &T) -> Result<(), StoreError> {
    store.set(key, encode(key, value)?)
}

pub(crate) fn decode<T: DeserializeOwned>(key: &str, value: Value) -> Result<T, StoreError> {
    serde_json::from_value(value).map_err(|source| StoreError::Corrupt {
        key: key.to_string(),
        source,
    })
}

pub(crate) fn encode<T: Serialize>(key: &str, value: &T) -> Result<Value, StoreError> {
    serde_json::to_value(value).map_err(|source| StoreError::Serialize {
        key: key.to_string(),
        source,
    })
}

/// In-process store; contents vanish with the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let entries = self.entries.lock().map_err(|_| StoreError::LockPoisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().map_err(|_| StoreError::LockPoisoned)?;
        entries.insert(key.to_string(), value);
        Ok(())
    }

    fn update_many(&self, keys: &[&str], f: &mut UpdateManyFn<'_>) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().map_err(|_| StoreError::LockPoisoned)?;
        let current = keys.iter().map(|key| entries.get(*key).cloned()).collect();
        for (key, value) in zip_updates(keys, f(current)?)? {
            entries.insert(key.to_string(), value);
        }
        Ok(())
    }
}
