//! Key/value cache.
//!
//! # Data Flow
//! ```text
//! [beaker.cache] section
//!     → namespaced_options (every key becomes `cache.<key>`)
//!     → CacheOptions::parse
//!     → CacheManager (one Cache per namespace or region)
//! ```
//!
//! # Design Decisions
//! - Values are stored as JSON so any serde type can be cached
//! - Expiry is checked on read; expired entries are dropped then
//! - Regions inherit the top-level type, directory and expiry

pub mod backend;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use toml::{Table, Value};

use crate::observability::metrics;
use backend::{now_secs, CacheBackend, Entry, FileBackend, MemoryBackend, NullBackend};

/// Prefix every cache option carries.
pub const OPTION_PREFIX: &str = "cache.";

/// Errors from cache configuration or cache operations.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Unsupported cache type '{0}' (expected 'memory' or 'file')")]
    UnsupportedType(String),

    #[error("Invalid value for {key}: '{value}'")]
    InvalidOption { key: String, value: String },

    #[error("Cache type 'file' requires cache.data_dir")]
    MissingDataDir,

    #[error("No cache region named '{0}'")]
    UnknownRegion(String),

    #[error("Cache value could not be (de)serialized: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Cache I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Supported cache backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheKind {
    Memory,
    File,
}

impl FromStr for CacheKind {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "memory" => Ok(CacheKind::Memory),
            "file" => Ok(CacheKind::File),
            other => Err(CacheError::UnsupportedType(other.to_string())),
        }
    }
}

/// Settings for one region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionOptions {
    pub kind: CacheKind,
    pub data_dir: Option<PathBuf>,
    pub expire: Option<Duration>,
}

/// Parsed cache options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheOptions {
    pub enabled: bool,
    pub kind: CacheKind,
    pub data_dir: Option<PathBuf>,
    pub expire: Option<Duration>,
    pub regions: BTreeMap<String, RegionOptions>,
}

/// Prefix every key of the cache section with `cache.`.
///
/// Nested tables (`long_term.expire = 3600`) flatten to dotted keys
/// (`cache.long_term.expire`). Non-string values are rendered as their TOML
/// text (`300`, `true`).
pub fn namespaced_options(section: &Table) -> BTreeMap<String, String> {
    let mut options = BTreeMap::new();
    flatten_into(&mut options, OPTION_PREFIX.trim_end_matches('.'), section);
    options
}

fn flatten_into(options: &mut BTreeMap<String, String>, prefix: &str, table: &Table) {
    for (key, value) in table {
        let name = format!("{}.{}", prefix, key);
        match value {
            Value::Table(nested) => flatten_into(options, &name, nested),
            Value::String(s) => {
                options.insert(name, s.clone());
            }
            other => {
                options.insert(name, other.to_string());
            }
        }
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, CacheError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(CacheError::InvalidOption {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

fn parse_expire(key: &str, value: &str) -> Result<Duration, CacheError> {
    value
        .trim()
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|_| CacheError::InvalidOption {
            key: key.to_string(),
            value: value.to_string(),
        })
}

impl CacheOptions {
    /// Parse `cache.*` options.
    pub fn parse(options: &BTreeMap<String, String>) -> Result<Self, CacheError> {
        let get = |name: &str| options.get(&format!("{}{}", OPTION_PREFIX, name));

        let enabled = match get("enabled") {
            Some(v) => parse_bool("cache.enabled", v)?,
            None => true,
        };
        let kind = match get("type") {
            Some(v) => v.parse()?,
            None => CacheKind::Memory,
        };
        let data_dir = get("data_dir").map(PathBuf::from);
        let expire = get("expire")
            .map(|v| parse_expire("cache.expire", v))
            .transpose()?;

        let mut regions = BTreeMap::new();
        let names = get("regions").map(String::as_str).unwrap_or_default();
        for name in names.split(',').map(str::trim).filter(|n| !n.is_empty()) {
            let region_key = |opt: &str| format!("{}{}.{}", OPTION_PREFIX, name, opt);
            let region = RegionOptions {
                kind: match options.get(&region_key("type")) {
                    Some(v) => v.parse()?,
                    None => kind,
                },
                data_dir: options
                    .get(&region_key("data_dir"))
                    .map(PathBuf::from)
                    .or_else(|| data_dir.clone()),
                expire: match options.get(&region_key("expire")) {
                    Some(v) => Some(parse_expire(&region_key("expire"), v)?),
                    None => expire,
                },
            };
            regions.insert(name.to_string(), region);
        }

        Ok(Self {
            enabled,
            kind,
            data_dir,
            expire,
            regions,
        })
    }

    fn defaults(&self) -> RegionOptions {
        RegionOptions {
            kind: self.kind,
            data_dir: self.data_dir.clone(),
            expire: self.expire,
        }
    }
}

/// A namespace of cached values.
#[derive(Debug, Clone)]
pub struct Cache {
    namespace: String,
    expire: Option<Duration>,
    backend: Arc<dyn CacheBackend>,
}

impl Cache {
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Fetch a value; expired or missing entries yield `None`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CacheError> {
        let entry = match self.backend.load(key)? {
            Some(entry) if entry.is_expired(now_secs()) => {
                self.backend.remove(key)?;
                None
            }
            other => other,
        };
        metrics::record_cache_lookup(&self.namespace, entry.is_some());
        entry
            .map(|e| serde_json::from_str(&e.value))
            .transpose()
            .map_err(Into::into)
    }

    pub fn put<T: Serialize>(&self, key: &str, value: &T) -> Result<(), CacheError> {
        let entry = Entry {
            value: serde_json::to_string(value)?,
            expires_at: self.expire.map(|d| now_secs().saturating_add(d.as_secs())),
        };
        self.backend.store(key, entry)
    }

    pub fn remove(&self, key: &str) -> Result<(), CacheError> {
        self.backend.remove(key)
    }

    pub fn clear(&self) -> Result<(), CacheError> {
        self.backend.clear()
    }

    /// Return the cached value, computing and storing it on a miss.
    pub fn get_or_insert_with<T, F>(&self, key: &str, create: F) -> Result<T, CacheError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> T,
    {
        if let Some(value) = self.get(key)? {
            return Ok(value);
        }
        let value = create();
        self.put(key, &value)?;
        Ok(value)
    }
}

/// Hands out caches by namespace and region.
#[derive(Debug, Clone)]
pub struct CacheManager {
    options: CacheOptions,
    caches: Arc<DashMap<String, Cache>>,
}

impl CacheManager {
    /// Check the options and prepare the data directory.
    pub fn new(options: CacheOptions) -> Result<Self, CacheError> {
        let needs_dir = options.enabled
            && std::iter::once(options.kind)
                .chain(options.regions.values().map(|r| r.kind))
                .any(|k| k == CacheKind::File);
        if needs_dir {
            let region_dirs = options.regions.values().filter(|r| r.kind == CacheKind::File);
            for region in region_dirs {
                let dir = region.data_dir.as_ref().ok_or(CacheError::MissingDataDir)?;
                std::fs::create_dir_all(dir)?;
            }
            if options.kind == CacheKind::File {
                let dir = options.data_dir.as_ref().ok_or(CacheError::MissingDataDir)?;
                std::fs::create_dir_all(dir)?;
            }
        }

        Ok(Self {
            options,
            caches: Arc::new(DashMap::new()),
        })
    }

    /// Build a manager straight from the `beaker.cache` section.
    pub fn from_section(section: &Table) -> Result<Self, CacheError> {
        Self::new(CacheOptions::parse(&namespaced_options(section))?)
    }

    pub fn options(&self) -> &CacheOptions {
        &self.options
    }

    /// Cache for a namespace, using the top-level settings.
    pub fn get_cache(&self, namespace: &str) -> Result<Cache, CacheError> {
        self.cache_for(namespace.to_string(), self.options.defaults())
    }

    /// Cache for a configured region.
    pub fn region(&self, name: &str) -> Result<Cache, CacheError> {
        let region = self
            .options
            .regions
            .get(name)
            .cloned()
            .ok_or_else(|| CacheError::UnknownRegion(name.to_string()))?;
        self.cache_for(format!("region:{}", name), region)
    }

    fn cache_for(&self, key: String, region: RegionOptions) -> Result<Cache, CacheError> {
        if let Some(cache) = self.caches.get(&key) {
            return Ok(cache.clone());
        }

        let backend: Arc<dyn CacheBackend> = match (self.options.enabled, region.kind) {
            (false, _) => Arc::new(NullBackend),
            (true, CacheKind::Memory) => Arc::new(MemoryBackend::default()),
            (true, CacheKind::File) => {
                let dir = region.data_dir.as_ref().ok_or(CacheError::MissingDataDir)?;
                Arc::new(FileBackend::new(dir, &key)?)
            }
        };
        let cache = Cache {
            namespace: key.clone(),
            expire: region.expire,
            backend,
        };
        Ok(self.caches.entry(key).or_insert(cache).clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section(text: &str) -> Table {
        toml::from_str(text).unwrap()
    }

    #[test]
    fn test_namespaced_options() {
        let options = namespaced_options(&section(
            "type = \"file\"\nexpire = 300\nenabled = true\ndata_dir = \"/tmp/c\"\n",
        ));
        assert_eq!(options["cache.type"], "file");
        assert_eq!(options["cache.expire"], "300");
        assert_eq!(options["cache.enabled"], "true");
        assert_eq!(options["cache.data_dir"], "/tmp/c");
        assert_eq!(options.len(), 4);
    }

    #[test]
    fn test_parse_regions() {
        let options = CacheOptions::parse(&namespaced_options(&section(
            r#"
            type = "memory"
            expire = 60
            regions = "short_term, long_term"
            "long_term.expire" = 3600
            "long_term.type" = "file"
            "long_term.data_dir" = "/var/cache/goblin"
            "#,
        )))
        .unwrap();

        assert_eq!(options.kind, CacheKind::Memory);
        assert_eq!(options.expire, Some(Duration::from_secs(60)));
        let short = &options.regions["short_term"];
        assert_eq!(short.kind, CacheKind::Memory);
        assert_eq!(short.expire, Some(Duration::from_secs(60)));
        let long = &options.regions["long_term"];
        assert_eq!(long.kind, CacheKind::File);
        assert_eq!(long.expire, Some(Duration::from_secs(3600)));
        assert_eq!(long.data_dir, Some(PathBuf::from("/var/cache/goblin")));
    }

    #[test]
    fn test_dotted_region_keys() {
        let options = namespaced_options(&section(
            r#"
            regions = "long_term"
            long_term.expire = 3600
            long_term.type = "memory"
            "#,
        ));
        assert_eq!(options["cache.long_term.expire"], "3600");
        assert!(!options.contains_key("cache.long_term"));

        let parsed = CacheOptions::parse(&options).unwrap();
        assert_eq!(
            parsed.regions["long_term"].expire,
            Some(Duration::from_secs(3600))
        );
    }

    #[test]
    fn test_invalid_options() {
        let err = CacheOptions::parse(&namespaced_options(&section("type = \"ext:memcached\"\n")))
            .unwrap_err();
        assert!(matches!(err, CacheError::UnsupportedType(_)));

        let err = CacheOptions::parse(&namespaced_options(&section("expire = \"soon\"\n")))
            .unwrap_err();
        assert!(matches!(err, CacheError::InvalidOption { key, .. } if key == "cache.expire"));

        let err = CacheManager::from_section(&section("type = \"file\"\n")).unwrap_err();
        assert!(matches!(err, CacheError::MissingDataDir));
    }

    #[test]
    fn test_memory_cache() {
        let manager = CacheManager::from_section(&section("type = \"memory\"\n")).unwrap();
        let cache = manager.get_cache("mediagoblin.tools").unwrap();

        assert_eq!(cache.get::<u32>("answer").unwrap(), None);
        cache.put("answer", &42u32).unwrap();
        assert_eq!(cache.get::<u32>("answer").unwrap(), Some(42));

        // Same namespace, same storage.
        let again = manager.get_cache("mediagoblin.tools").unwrap();
        assert_eq!(again.get::<u32>("answer").unwrap(), Some(42));

        let mut calls = 0;
        let value: Vec<String> = cache
            .get_or_insert_with("tags", || {
                calls += 1;
                vec!["cat".to_string()]
            })
            .unwrap();
        assert_eq!(value, vec!["cat".to_string()]);
        let _: Vec<String> = cache.get_or_insert_with("tags", || unreachable!()).unwrap();
        assert_eq!(calls, 1);

        cache.remove("answer").unwrap();
        assert_eq!(cache.get::<u32>("answer").unwrap(), None);
    }

    #[test]
    fn test_file_cache_persists_across_managers() {
        let dir = tempfile::tempdir().unwrap();
        let text = format!("type = \"file\"\ndata_dir = \"{}\"\n", dir.path().display());

        let first = CacheManager::from_section(&section(&text)).unwrap();
        first.get_cache("ns").unwrap().put("k", &"v").unwrap();

        let second = CacheManager::from_section(&section(&text)).unwrap();
        assert_eq!(
            second.get_cache("ns").unwrap().get::<String>("k").unwrap().as_deref(),
            Some("v")
        );
    }

    #[test]
    fn test_expired_entries() {
        let manager =
            CacheManager::from_section(&section("type = \"memory\"\nexpire = 0\n")).unwrap();
        let cache = manager.get_cache("ns").unwrap();
        cache.put("k", &1u8).unwrap();
        assert_eq!(cache.get::<u8>("k").unwrap(), None);
    }

    #[test]
    fn test_huge_expire_never_expires() {
        let manager = CacheManager::from_section(&section(
            "type = \"memory\"\nexpire = \"18446744073709551615\"\n",
        ))
        .unwrap();
        let cache = manager.get_cache("ns").unwrap();
        cache.put("k", &7u8).unwrap();
        assert_eq!(cache.get::<u8>("k").unwrap(), Some(7));
    }

    #[test]
    fn test_disabled_cache_stores_nothing() {
        let manager =
            CacheManager::from_section(&section("type = \"file\"\nenabled = false\n")).unwrap();
        let cache = manager.get_cache("ns").unwrap();
        cache.put("k", &1u8).unwrap();
        assert_eq!(cache.get::<u8>("k").unwrap(), None);
    }

    #[test]
    fn test_unknown_region() {
        let manager = CacheManager::from_section(&section("type = \"memory\"\n")).unwrap();
        assert!(matches!(manager.region("short_term"), Err(CacheError::UnknownRegion(_))));
    }
}
