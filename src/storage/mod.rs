//! Blob storage subsystem.
//!
//! # Data Flow
//! ```text
//! [storage:<name>] section
//!     → registry.rs (storage_class → constructor)
//!     → filestorage.rs / memory.rs
//!     → Arc<dyn StorageBackend> published as public_store / queue_store
//! ```
//!
//! # Design Decisions
//! - Call sites only see the capability set on `StorageBackend`
//! - Paths are lists of sanitized components, never raw strings
//! - Each store is built from its own copy of its section

pub mod filestorage;
pub mod memory;
pub mod registry;

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use toml::Table;
use url::Url;
use uuid::Uuid;

pub use filestorage::FileStorage;
pub use memory::MemoryStorage;
pub use registry::{StorageConstructor, StorageRegistry};

/// Errors raised by storage backends.
#[derive(Debug, Error)]
pub enum StorageError {
    /// A path component is empty, relative or contains a separator.
    #[error("Invalid storage path component '{0}'")]
    InvalidPath(String),

    /// Nothing is stored at the path.
    #[error("No such file in storage: {0}")]
    NotFound(StoragePath),

    /// The backend has no base_url, so it cannot serve files.
    #[error("Storage backend has no base_url; {0} is not web accessible")]
    NoWebAccess(StoragePath),

    /// No backend is registered under the configured class name.
    #[error("Unknown storage_class '{class}' (known: {known})")]
    UnknownClass { class: String, known: String },

    /// The backend's section could not be deserialized.
    #[error("Invalid storage config: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A location inside a store, as a list of path components.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StoragePath(Vec<String>);

impl StoragePath {
    /// Build a path from components, rejecting anything that could escape
    /// the store (`..`, separators, empty components).
    pub fn new<I, S>(components: I) -> Result<Self, StorageError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let components: Vec<String> = components.into_iter().map(Into::into).collect();
        if components.is_empty() {
            return Err(StorageError::InvalidPath(String::new()));
        }
        for c in &components {
            if c.is_empty() || c == "." || c == ".." || c.contains('/') || c.contains('\\') {
                return Err(StorageError::InvalidPath(c.clone()));
            }
        }
        Ok(Self(components))
    }

    /// Parse a `/`-separated path.
    pub fn parse(path: &str) -> Result<Self, StorageError> {
        Self::new(path.split('/'))
    }

    pub fn components(&self) -> &[String] {
        &self.0
    }

    /// Last component.
    pub fn file_name(&self) -> &str {
        self.0.last().map(String::as_str).unwrap_or_default()
    }

    /// Same directory, different file name.
    pub fn with_file_name(&self, name: impl Into<String>) -> Result<Self, StorageError> {
        let mut components = self.0.clone();
        components.pop();
        components.push(name.into());
        Self::new(components)
    }
}

impl fmt::Display for StoragePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("/"))
    }
}

/// Capability set every storage backend provides.
pub trait StorageBackend: Send + Sync + fmt::Debug {
    /// Short backend name for logs.
    fn class_name(&self) -> &'static str;

    fn exists(&self, path: &StoragePath) -> Result<bool, StorageError>;

    fn get(&self, path: &StoragePath) -> Result<Vec<u8>, StorageError>;

    /// Store `data`, replacing anything already at `path`.
    fn put(&self, path: &StoragePath, data: &[u8]) -> Result<(), StorageError>;

    fn delete(&self, path: &StoragePath) -> Result<(), StorageError>;

    /// Public URL for a stored file.
    fn url_for(&self, path: &StoragePath) -> Result<String, StorageError>;

    /// Filesystem path, for backends that keep files locally.
    fn local_path(&self, _path: &StoragePath) -> Option<PathBuf> {
        None
    }

    /// A path next to `path` whose file name is prefixed with a fresh uuid.
    fn unique_filepath(&self, path: &StoragePath) -> Result<StoragePath, StorageError> {
        let unique = format!("{}-{}", Uuid::new_v4().simple(), path.file_name());
        path.with_file_name(unique)
    }
}

/// Construct a backend from its config section.
pub fn storage_system_from_config(
    section: &Table,
    registry: &StorageRegistry,
) -> Result<Arc<dyn StorageBackend>, StorageError> {
    registry.construct(section)
}

/// Join a base URL and a storage path.
///
/// Absolute URLs get percent-encoded path segments; plain base paths, and
/// URLs that cannot carry a path (`localhost:8080/media/`), are joined as
/// strings.
pub(crate) fn join_url(base_url: &str, path: &StoragePath) -> String {
    if let Ok(mut url) = Url::parse(base_url) {
        let joined = if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().extend(path.components());
            drop(segments);
            true
        } else {
            false
        };
        if joined {
            return url.to_string();
        }
    }
    format!("{}/{}", base_url.trim_end_matches('/'), path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_path_validation() {
        assert!(StoragePath::parse("media/ab/cd.png").is_ok());
        assert!(matches!(StoragePath::parse("../etc/passwd"), Err(StorageError::InvalidPath(c)) if c == ".."));
        assert!(StoragePath::parse("a//b").is_err());
        assert!(StoragePath::new(Vec::<String>::new()).is_err());
        assert!(StoragePath::new(["a\\b"]).is_err());
    }

    #[test]
    fn test_with_file_name() {
        let path = StoragePath::parse("media/1/photo.jpg").unwrap();
        let thumb = path.with_file_name("thumb.jpg").unwrap();
        assert_eq!(thumb.to_string(), "media/1/thumb.jpg");
        assert_eq!(thumb.file_name(), "thumb.jpg");
    }

    #[test]
    fn test_join_url() {
        let path = StoragePath::parse("media/a b.png").unwrap();
        assert_eq!(join_url("/mgoblin_media/", &path), "/mgoblin_media/media/a b.png");
        assert_eq!(
            join_url("https://cdn.example.org/media/", &path),
            "https://cdn.example.org/media/media/a%20b.png"
        );
    }

    #[test]
    fn test_join_url_keeps_path_on_opaque_base() {
        let path = StoragePath::parse("media/1/photo.jpg").unwrap();
        assert_eq!(
            join_url("localhost:8080/media/", &path),
            "localhost:8080/media/media/1/photo.jpg"
        );
    }
}
