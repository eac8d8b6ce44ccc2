//! In-process storage, mostly for tests and throwaway instances.

use std::sync::Arc;

use dashmap::DashMap;
use serde::Deserialize;
use toml::{Table, Value};

use crate::observability::metrics;
use crate::storage::{join_url, StorageBackend, StorageError, StoragePath};

#[derive(Debug, Clone, Default, Deserialize)]
struct MemoryStorageConfig {
    #[serde(default)]
    base_url: Option<String>,
}

/// A thread-safe map of path -> bytes.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    files: DashMap<StoragePath, Vec<u8>>,
    base_url: Option<String>,
}

impl MemoryStorage {
    pub fn new(base_url: Option<String>) -> Self {
        Self {
            files: DashMap::new(),
            base_url,
        }
    }

    /// Registry constructor.
    pub fn from_config(section: &Table) -> Result<Arc<dyn StorageBackend>, StorageError> {
        let config: MemoryStorageConfig = Value::Table(section.clone()).try_into()?;
        Ok(Arc::new(Self::new(config.base_url)))
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl StorageBackend for MemoryStorage {
    fn class_name(&self) -> &'static str {
        "memory"
    }

    fn exists(&self, path: &StoragePath) -> Result<bool, StorageError> {
        Ok(self.files.contains_key(path))
    }

    fn get(&self, path: &StoragePath) -> Result<Vec<u8>, StorageError> {
        metrics::record_storage_op("get");
        self.files
            .get(path)
            .map(|r| r.value().clone())
            .ok_or_else(|| StorageError::NotFound(path.clone()))
    }

    fn put(&self, path: &StoragePath, data: &[u8]) -> Result<(), StorageError> {
        metrics::record_storage_op("put");
        self.files.insert(path.clone(), data.to_vec());
        Ok(())
    }

    fn delete(&self, path: &StoragePath) -> Result<(), StorageError> {
        metrics::record_storage_op("delete");
        self.files
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound(path.clone()))
    }

    fn url_for(&self, path: &StoragePath) -> Result<String, StorageError> {
        match &self.base_url {
            Some(base) => Ok(join_url(base, path)),
            None => Err(StorageError::NoWebAccess(path.clone())),
        }
    }
}
