//! The parsed configuration tree.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use toml::{Table, Value};

use crate::config::loader::ConfigError;
use crate::config::schema::{section_value, AppConfig, APP_SECTION};

/// Whole configuration file, validated and with defaults filled in.
///
/// Immutable once loaded. Sections are handed out by reference; anything
/// that needs to keep a section clones it.
#[derive(Debug, Clone, PartialEq)]
pub struct GlobalConfig {
    tree: Table,
    here: PathBuf,
    source: Option<PathBuf>,
}

impl GlobalConfig {
    pub(crate) fn new(tree: Table, here: PathBuf, source: Option<PathBuf>) -> Self {
        Self { tree, here, source }
    }

    /// Directory `%(here)s` expanded to.
    pub fn here(&self) -> &Path {
        &self.here
    }

    /// File the configuration was read from, if any.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn tree(&self) -> &Table {
        &self.tree
    }

    /// Look up a section; dotted names fall back to nested tables.
    pub fn section(&self, name: &str) -> Option<&Table> {
        section_value(&self.tree, name).and_then(Value::as_table)
    }

    /// Like [`GlobalConfig::section`] but a missing section is an error.
    pub fn require_section(&self, name: &str) -> Result<&Table, ConfigError> {
        self.section(name)
            .ok_or_else(|| ConfigError::MissingSection(name.to_string()))
    }

    /// Deserialize a section into a typed struct.
    pub fn typed_section<T: DeserializeOwned>(&self, name: &str) -> Result<T, ConfigError> {
        let table = self.require_section(name)?.clone();
        Value::Table(table)
            .try_into()
            .map_err(|source| ConfigError::Section {
                section: name.to_string(),
                source,
            })
    }

    /// The `[mediagoblin]` section as [`AppConfig`].
    pub fn app_config(&self) -> Result<AppConfig, ConfigError> {
        self.typed_section(APP_SECTION)
    }
}

/// Replace `%(here)s` in every string value, recursively.
pub(crate) fn interpolate_here(value: &mut Value, here: &str) {
    match value {
        Value::String(s) if s.contains(super::schema::HERE_PLACEHOLDER) => {
            *s = s.replace(super::schema::HERE_PLACEHOLDER, here);
        }
        Value::Array(items) => items.iter_mut().for_each(|v| interpolate_here(v, here)),
        Value::Table(table) => table.iter_mut().for_each(|(_, v)| interpolate_here(v, here)),
        _ => {}
    }
}
