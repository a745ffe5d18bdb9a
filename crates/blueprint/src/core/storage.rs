//! Storage backends for store snapshots
//!
//! A backend is a flat key-value store of strings. Each persistent store
//! claims one item name and writes its whole snapshot there.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use tracing::trace;

use super::StoreError;

/// Synchronous key-value storage contract
///
/// Mirrors the browser `Storage` interface: any conforming implementation
/// can back a store.
pub trait StorageBackend: Send + Sync {
    /// Read an item, `None` if it does not exist
    fn get_item(&self, name: &str) -> Result<Option<String>, StoreError>;

    /// Create or replace an item
    fn set_item(&self, name: &str, value: &str) -> Result<(), StoreError>;

    /// Delete an item; deleting a missing item is not an error
    fn remove_item(&self, name: &str) -> Result<(), StoreError>;
}

impl<T: StorageBackend + ?Sized> StorageBackend for Arc<T> {
    fn get_item(&self, name: &str) -> Result<Option<String>, StoreError> {
        (**self).get_item(name)
    }

    fn set_item(&self, name: &str, value: &str) -> Result<(), StoreError> {
        (**self).set_item(name, value)
    }

    fn remove_item(&self, name: &str) -> Result<(), StoreError> {
        (**self).remove_item(name)
    }
}

/// In-memory storage backed by a HashMap
///
/// Clones share the same map, so several stores (or a test and the store
/// under test) can observe the same items.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    items: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryStorage {
    /// Create a new empty storage
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of stored items
    pub fn len(&self) -> usize {
        self.items.read().map(|items| items.len()).unwrap_or(0)
    }

    /// Check if no items are stored
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Names of all stored items, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .items
            .read()
            .map(|items| items.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }
}

impl StorageBackend for MemoryStorage {
    fn get_item(&self, name: &str) -> Result<Option<String>, StoreError> {
        let items = self
            .items
            .read()
            .map_err(|_| StoreError::storage("lock poisoned"))?;
        Ok(items.get(name).cloned())
    }

    fn set_item(&self, name: &str, value: &str) -> Result<(), StoreError> {
        let mut items = self
            .items
            .write()
            .map_err(|_| StoreError::storage("lock poisoned"))?;
        items.insert(name.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, name: &str) -> Result<(), StoreError> {
        let mut items = self
            .items
            .write()
            .map_err(|_| StoreError::storage("lock poisoned"))?;
        items.remove(name);
        Ok(())
    }
}

/// File-backed storage: one `<name>.json` file per item in a directory
///
/// Writes go to a temporary file that is renamed over the target, so a
/// crash never leaves a half-written snapshot behind.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

const ITEM_EXTENSION: &str = "json";

impl FileStorage {
    /// Create storage rooted at `dir`; the directory is created on first write
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Create storage rooted at `dir`, creating the directory now
    pub fn create(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let storage = Self::new(dir);
        fs::create_dir_all(&storage.dir)?;
        Ok(storage)
    }

    /// The directory holding the item files
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Names of all stored items, sorted
    pub fn names(&self) -> Result<Vec<String>, StoreError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(ITEM_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                if !stem.starts_with('.') {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    fn item_path(&self, name: &str) -> Result<PathBuf, StoreError> {
        let valid = !name.is_empty()
            && !name.starts_with('.')
            && !name
                .chars()
                .any(|c| c == '/' || c == '\\' || c == '\0' || c == ':');
        if !valid {
            return Err(StoreError::invalid_name(name));
        }
        Ok(self.dir.join(format!("{}.{}", name, ITEM_EXTENSION)))
    }
}

impl StorageBackend for FileStorage {
    fn get_item(&self, name: &str) -> Result<Option<String>, StoreError> {
        let path = self.item_path(name)?;
        match fs::read_to_string(&path) {
            Ok(contents) => {
                trace!(path = %path.display(), bytes = contents.len(), "Read item");
                Ok(Some(contents))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set_item(&self, name: &str, value: &str) -> Result<(), StoreError> {
        let path = self.item_path(name)?;
        fs::create_dir_all(&self.dir)?;

        let tmp_path = self.dir.join(format!(".{}.{}.tmp", name, ITEM_EXTENSION));
        fs::write(&tmp_path, value)?;
        if let Err(e) = fs::rename(&tmp_path, &path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e.into());
        }
        trace!(path = %path.display(), bytes = value.len(), "Wrote item");
        Ok(())
    }

    fn remove_item(&self, name: &str) -> Result<(), StoreError> {
        let path = self.item_path(name)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
