//! Cache storage backends.

use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::cache::CacheError;

/// Seconds since the epoch.
pub(crate) fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// A cached value (already serialized) and when it stops being valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub value: String,
    pub expires_at: Option<u64>,
}

impl Entry {
    pub fn is_expired(&self, now: u64) -> bool {
        matches!(self.expires_at, Some(at) if at <= now)
    }
}

/// Where a cache namespace keeps its entries.
pub trait CacheBackend: Send + Sync + fmt::Debug {
    fn load(&self, key: &str) -> Result<Option<Entry>, CacheError>;
    fn store(&self, key: &str, entry: Entry) -> Result<(), CacheError>;
    fn remove(&self, key: &str) -> Result<(), CacheError>;
    fn clear(&self) -> Result<(), CacheError>;
}

/// Entries in process memory.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: DashMap<String, Entry>,
}

impl CacheBackend for MemoryBackend {
    fn load(&self, key: &str) -> Result<Option<Entry>, CacheError> {
        Ok(self.entries.get(key).map(|r| r.value().clone()))
    }

    fn store(&self, key: &str, entry: Entry) -> Result<(), CacheError> {
        self.entries.insert(key.to_string(), entry);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), CacheError> {
        self.entries.remove(key);
        Ok(())
    }

    fn clear(&self) -> Result<(), CacheError> {
        self.entries.clear();
        Ok(())
    }
}

/// Directory name for a namespace; always a single component below the
/// data directory (no separators, never `.` or `..`).
fn namespace_dir_name(namespace: &str) -> String {
    let mut safe: String = namespace
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '.' { c } else { '_' })
        .collect();
    if safe.is_empty() || safe.starts_with('.') {
        safe.insert(0, '_');
    }
    safe
}

/// One JSON file per key under `<data_dir>/<namespace>/`.
#[derive(Debug)]
pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    pub fn new(data_dir: &std::path::Path, namespace: &str) -> Result<Self, CacheError> {
        let dir = data_dir.join(namespace_dir_name(namespace));
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let hex: String = key.bytes().map(|b| format!("{:02x}", b)).collect();
        self.dir.join(format!("{}.json", hex))
    }
}

impl CacheBackend for FileBackend {
    fn load(&self, key: &str) -> Result<Option<Entry>, CacheError> {
        match fs::read(self.path_for(key)) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn store(&self, key: &str, entry: Entry) -> Result<(), CacheError> {
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec(&entry)?)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), CacheError> {
        match fs::remove_file(self.path_for(key)) {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }

    fn clear(&self) -> Result<(), CacheError> {
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                fs::remove_file(path)?;
            }
        }
        Ok(())
    }
}

/// Backend used when caching is disabled: stores nothing.
#[derive(Debug, Default)]
pub struct NullBackend;

impl CacheBackend for NullBackend {
    fn load(&self, _key: &str) -> Result<Option<Entry>, CacheError> {
        Ok(None)
    }

    fn store(&self, _key: &str, _entry: Entry) -> Result<(), CacheError> {
        Ok(())
    }

    fn remove(&self, _key: &str) -> Result<(), CacheError> {
        Ok(())
    }

    fn clear(&self) -> Result<(), CacheError> {
        Ok(())
    }
}
