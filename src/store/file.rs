use fs2::FileExt;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::path::PathBuf;

use super::{KeyValueStore, UpdateManyFn, zip_updates};
use crate::errors::StoreError;

type Document = BTreeMap<String, Value>;

/// A store persisted as one JSON object on disk.
///
/// Every operation re-reads the file, so a run loop in one process observes a
/// `stop` written by another. Writes go to a temporary file that is renamed over the
/// document, and all access is serialized through an exclusive lock on a sidecar
/// `.lock` file.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
    lock_path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let lock_path = path.with_extension("lock");
        Self { path, lock_path }
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }

    /// Take the exclusive lock; it is released when the returned file is dropped.
    fn lock(&self) -> Result<File, StoreError> {
        if let Some(parent) = self.lock_path.parent() {
            fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&self.lock_path)
            .map_err(|e| self.io_error(e))?;
        file.lock_exclusive().map_err(|e| self.io_error(e))?;
        Ok(file)
    }

    fn load(&self) -> Result<Document, StoreError> {
        if !self.path.exists() {
            return Ok(Document::new());
        }
        let content = fs::read_to_string(&self.path).map_err(|e| self.io_error(e))?;
        if content.trim().is_empty() {
            return Ok(Document::new());
        }
        serde_json::from_str(&content).map_err(|source| StoreError::CorruptDocument {
            path: self.path.clone(),
            source,
        })
    }

    fn save(&self, document: &Document) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(document).map_err(|source| {
            StoreError::Serialize {
                key: "*".to_string(),
                source,
            }
        })?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|e| self.io_error(e))?;
        fs::rename(&tmp, &self.path).map_err(|e| self.io_error(e))
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let _guard = self.lock()?;
        Ok(self.load()?.remove(key))
    }

    fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        let _guard = self.lock()?;
        let mut document = self.load()?;
        document.insert(key.to_string(), value);
        self.save(&document)
    }

    fn update_many(&self, keys: &[&str], f: &mut UpdateManyFn<'_>) -> Result<(), StoreError> {
        let _guard = self.lock()?;
        let mut document = self.load()?;
        let current = keys.iter().map(|key| document.get(*key).cloned()).collect();
        let updates = zip_updates(keys, f(current)?)?;
        if updates.is_empty() {
            return Ok(());
        }
        for (key, value) in updates {
            document.insert(key.to_string(), value);
        }
        self.save(&document)
    }
}
