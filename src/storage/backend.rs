use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use serde_json::{Map, Value};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::StorageError;

/// Durable string key-value storage. Batches are all-or-nothing.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Applies every insert and removal as one batch.
    fn apply(&self, set: &[(&str, String)], remove: &[&str]) -> Result<(), StorageError>;

    fn set_many(&self, entries: &[(&str, String)]) -> Result<(), StorageError> {
        self.apply(entries, &[])
    }

    fn remove_many(&self, keys: &[&str]) -> Result<(), StorageError> {
        self.apply(&[], keys)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(lock(&self.entries).get(key).cloned())
    }

    fn apply(&self, set: &[(&str, String)], remove: &[&str]) -> Result<(), StorageError> {
        let mut map = lock(&self.entries);
        for key in remove {
            map.remove(*key);
        }
        for (key, value) in set {
            map.insert((*key).to_string(), value.clone());
        }
        Ok(())
    }
}

/// Stores every key in one JSON object file.
///
/// Each batch rewrites a sibling temporary file and renames it over the
/// original, so readers observe either the old or the new batch.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    guard: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            guard: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> Result<Map<String, Value>, StorageError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(StorageError::Io(e.to_string())),
        };

        if raw.trim().is_empty() {
            return Ok(Map::new());
        }

        match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(StorageError::Corrupt(format!(
                "{} does not contain a JSON object",
                self.path.display()
            ))),
            Err(e) => Err(StorageError::Corrupt(e.to_string())),
        }
    }

    fn write_map(&self, map: &Map<String, Value>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| StorageError::Io(e.to_string()))?;
            }
        }

        let serialized = serde_json::to_string_pretty(map)
            .map_err(|e| StorageError::Corrupt(e.to_string()))?;

        // Unique per write so stores sharing a path never clobber each other's temp file.
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(format!(".{}.tmp", Uuid::new_v4()));
        let tmp = PathBuf::from(tmp);

        if let Err(e) = fs::write(&tmp, serialized) {
            let _ = fs::remove_file(&tmp);
            return Err(StorageError::Io(e.to_string()));
        }
        fs::rename(&tmp, &self.path).map_err(|e| {
            warn!("Failed to replace {}: {}", self.path.display(), e);
            let _ = fs::remove_file(&tmp);
            StorageError::Io(e.to_string())
        })?;

        debug!("Wrote {} storage keys to {}", map.len(), self.path.display());
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let _guard = lock(&self.guard);
        let map = self.read_map()?;
        Ok(map.get(key).and_then(|value| value.as_str()).map(str::to_string))
    }

    fn apply(&self, set: &[(&str, String)], remove: &[&str]) -> Result<(), StorageError> {
        let _guard = lock(&self.guard);
        let mut map = match self.read_map() {
            Ok(map) => map,
            // A corrupt file is replaced rather than blocking writes.
            Err(StorageError::Corrupt(reason)) => {
                warn!("Discarding corrupt storage file {}: {}", self.path.display(), reason);
                Map::new()
            }
            Err(e) => return Err(e),
        };
        for key in remove {
            map.remove(*key);
        }
        for (key, value) in set {
            map.insert((*key).to_string(), Value::String(value.clone()));
        }
        self.write_map(&map)
    }
}
