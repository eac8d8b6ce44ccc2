//! Storage backend registry.
//!
//! # Responsibilities
//! - Map `storage_class` names to constructor functions
//! - Reject unknown classes at startup, listing the known ones
//!
//! # Design Decisions
//! - Built-in backends are registered by `Default`
//! - Embedders register extra backends before startup runs

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use toml::{Table, Value};

use crate::storage::{FileStorage, MemoryStorage, StorageBackend, StorageError};

/// Storage class used when a section does not name one.
pub const DEFAULT_STORAGE_CLASS: &str = "filestorage";

/// Builds a backend from its config section.
pub type StorageConstructor = fn(&Table) -> Result<Arc<dyn StorageBackend>, StorageError>;

/// Known storage backends, keyed by `storage_class`.
#[derive(Clone)]
pub struct StorageRegistry {
    constructors: BTreeMap<String, StorageConstructor>,
}

impl StorageRegistry {
    /// A registry without any backends.
    pub fn empty() -> Self {
        Self {
            constructors: BTreeMap::new(),
        }
    }

    /// Register a backend, returning the constructor it replaced.
    pub fn register(
        &mut self,
        class: impl Into<String>,
        constructor: StorageConstructor,
    ) -> Option<StorageConstructor> {
        self.constructors.insert(class.into(), constructor)
    }

    pub fn known_classes(&self) -> Vec<&str> {
        self.constructors.keys().map(String::as_str).collect()
    }

    /// Build the backend named by the section's `storage_class`.
    pub fn construct(&self, section: &Table) -> Result<Arc<dyn StorageBackend>, StorageError> {
        let class = section
            .get("storage_class")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_STORAGE_CLASS);

        let constructor = self
            .constructors
            .get(class)
            .ok_or_else(|| StorageError::UnknownClass {
                class: class.to_string(),
                known: self.known_classes().join(", "),
            })?;

        tracing::debug!(storage_class = %class, "Constructing storage backend");
        constructor(section)
    }
}

impl Default for StorageRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register("filestorage", FileStorage::from_config);
        registry.register("memory", MemoryStorage::from_config);
        registry
    }
}

impl fmt::Debug for StorageRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageRegistry")
            .field("classes", &self.known_classes())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_classes() {
        let registry = StorageRegistry::default();
        assert_eq!(registry.known_classes(), vec!["filestorage", "memory"]);

        let section: Table = toml::from_str("storage_class = \"memory\"\n").unwrap();
        let store = registry.construct(&section).unwrap();
        assert_eq!(store.class_name(), "memory");
    }

    #[test]
    fn test_default_class_is_filestorage() {
        let section: Table = toml::from_str("base_dir = \"/tmp/goblin-public\"\n").unwrap();
        let store = StorageRegistry::default().construct(&section).unwrap();
        assert_eq!(store.class_name(), "filestorage");
    }

    #[test]
    fn test_unknown_class() {
        let section: Table = toml::from_str("storage_class = \"cloudfiles\"\n").unwrap();
        let err = StorageRegistry::default().construct(&section).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unknown storage_class 'cloudfiles' (known: filestorage, memory)"
        );
    }

    #[test]
    fn test_register_custom_backend() {
        fn always_memory(_: &Table) -> Result<Arc<dyn StorageBackend>, StorageError> {
            Ok(Arc::new(MemoryStorage::default()))
        }

        let mut registry = StorageRegistry::empty();
        assert!(registry.register("custom", always_memory).is_none());
        let section: Table = toml::from_str("storage_class = \"custom\"\n").unwrap();
        assert!(registry.construct(&section).is_ok());
        assert!(registry.register("custom", always_memory).is_some());
    }
}
