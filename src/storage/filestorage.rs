//! Local filesystem storage.

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Deserialize;
use toml::{Table, Value};

use crate::observability::metrics;
use crate::storage::{join_url, StorageBackend, StorageError, StoragePath};

#[derive(Debug, Clone, Deserialize)]
struct FileStorageConfig {
    base_dir: PathBuf,
    #[serde(default)]
    base_url: Option<String>,
}

/// Files under `base_dir`, served from `base_url`.
#[derive(Debug, Clone)]
pub struct FileStorage {
    base_dir: PathBuf,
    base_url: Option<String>,
}

impl FileStorage {
    pub fn new(base_dir: impl Into<PathBuf>, base_url: Option<String>) -> Self {
        Self {
            base_dir: base_dir.into(),
            base_url,
        }
    }

    /// Registry constructor.
    pub fn from_config(section: &Table) -> Result<Arc<dyn StorageBackend>, StorageError> {
        let config: FileStorageConfig = Value::Table(section.clone()).try_into()?;
        Ok(Arc::new(Self::new(config.base_dir, config.base_url)))
    }

    pub fn base_dir(&self) -> &std::path::Path {
        &self.base_dir
    }

    fn resolve(&self, path: &StoragePath) -> PathBuf {
        path.components()
            .iter()
            .fold(self.base_dir.clone(), |acc, c| acc.join(c))
    }
}

impl StorageBackend for FileStorage {
    fn class_name(&self) -> &'static str {
        "filestorage"
    }

    fn exists(&self, path: &StoragePath) -> Result<bool, StorageError> {
        Ok(self.resolve(path).is_file())
    }

    fn get(&self, path: &StoragePath) -> Result<Vec<u8>, StorageError> {
        metrics::record_storage_op("get");
        fs::read(self.resolve(path)).map_err(|e| match e.kind() {
            ErrorKind::NotFound => StorageError::NotFound(path.clone()),
            _ => StorageError::Io(e),
        })
    }

    fn put(&self, path: &StoragePath, data: &[u8]) -> Result<(), StorageError> {
        metrics::record_storage_op("put");
        let target = self.resolve(path);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(target, data)?;
        Ok(())
    }

    fn delete(&self, path: &StoragePath) -> Result<(), StorageError> {
        metrics::record_storage_op("delete");
        fs::remove_file(self.resolve(path)).map_err(|e| match e.kind() {
            ErrorKind::NotFound => StorageError::NotFound(path.clone()),
            _ => StorageError::Io(e),
        })
    }

    fn url_for(&self, path: &StoragePath) -> Result<String, StorageError> {
        match &self.base_url {
            Some(base) => Ok(join_url(base, path)),
            None => Err(StorageError::NoWebAccess(path.clone())),
        }
    }

    fn local_path(&self, path: &StoragePath) -> Option<PathBuf> {
        Some(self.resolve(path))
    }
}
