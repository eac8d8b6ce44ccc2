//! Configuration schema definitions.
//!
//! The schema lists every known section and key with its expected type and
//! default. Defaults are filled into the parsed tree before validation, the
//! way the config file itself would read if the operator had written them
//! out. String defaults may use the `%(here)s` placeholder, which expands to
//! the directory holding the config file.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use toml::{Table, Value};

/// Application section.
pub const APP_SECTION: &str = "mediagoblin";
/// Store that serves finished media.
pub const PUBLIC_STORE_SECTION: &str = "storage:publicstore";
/// Store that holds uploads waiting to be processed.
pub const QUEUE_STORE_SECTION: &str = "storage:queuestore";
/// Cache backend options.
pub const CACHE_SECTION: &str = "beaker.cache";

/// Placeholder expanded to the config file's directory.
pub const HERE_PLACEHOLDER: &str = "%(here)s";

/// Expected type of a configuration value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    Bool,
    Integer,
    StringList,
}

impl FieldKind {
    /// Human readable name used in validation reports.
    pub fn describe(&self) -> &'static str {
        match self {
            FieldKind::String => "a string",
            FieldKind::Bool => "a boolean",
            FieldKind::Integer => "an integer",
            FieldKind::StringList => "a list of strings",
        }
    }

    /// Check a value against this kind.
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (FieldKind::String, Value::String(_)) => true,
            (FieldKind::Bool, Value::Boolean(_)) => true,
            (FieldKind::Integer, Value::Integer(_)) => true,
            (FieldKind::StringList, Value::Array(items)) => {
                items.iter().all(|item| item.is_str())
            }
            _ => false,
        }
    }
}

/// Default applied when a key is missing.
#[derive(Debug, Clone, Copy)]
pub enum FieldDefault {
    None,
    Str(&'static str),
    Bool(bool),
    Int(i64),
    List(&'static [&'static str]),
}

impl FieldDefault {
    fn to_value(self) -> Option<Value> {
        match self {
            FieldDefault::None => None,
            FieldDefault::Str(s) => Some(Value::String(s.to_string())),
            FieldDefault::Bool(b) => Some(Value::Boolean(b)),
            FieldDefault::Int(i) => Some(Value::Integer(i)),
            FieldDefault::List(items) => Some(Value::Array(
                items.iter().map(|s| Value::String(s.to_string())).collect(),
            )),
        }
    }
}

/// A single key in a section.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub key: &'static str,
    pub kind: FieldKind,
    pub default: FieldDefault,
}

/// How the loader treats a section missing from the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionPresence {
    /// Missing section is a validation error.
    Required,
    /// Missing section is created and filled with defaults.
    CreateWithDefaults,
    /// Missing section stays missing; defaults only fill a present section.
    Optional,
}

/// A section of the configuration file.
#[derive(Debug, Clone, Copy)]
pub struct SectionSpec {
    pub name: &'static str,
    pub presence: SectionPresence,
    pub fields: &'static [FieldSpec],
}

const fn field(key: &'static str, kind: FieldKind, default: FieldDefault) -> FieldSpec {
    FieldSpec { key, kind, default }
}

/// Every section and key this application knows about.
pub const SCHEMA: &[SectionSpec] = &[
    SectionSpec {
        name: APP_SECTION,
        presence: SectionPresence::Required,
        fields: &[
            field("html_title", FieldKind::String, FieldDefault::Str("GNU MediaGoblin")),
            field(
                "db_uri",
                FieldKind::String,
                FieldDefault::Str("sqlite://%(here)s/mediagoblin.db"),
            ),
            field("db_max_connections", FieldKind::Integer, FieldDefault::Int(5)),
            field("direct_remote_path", FieldKind::String, FieldDefault::None),
            field(
                "workbench_path",
                FieldKind::String,
                FieldDefault::Str("%(here)s/user_dev/media/workbench"),
            ),
            field("user_template_path", FieldKind::String, FieldDefault::None),
            field("theme", FieldKind::String, FieldDefault::None),
            field(
                "theme_install_dir",
                FieldKind::String,
                FieldDefault::Str("%(here)s/user_dev/themes"),
            ),
            field("media_types", FieldKind::StringList, FieldDefault::List(&["image"])),
            field("allow_registration", FieldKind::Bool, FieldDefault::Bool(true)),
            field(
                "email_sender_address",
                FieldKind::String,
                FieldDefault::Str("notice@mediagoblin.example.org"),
            ),
            field("email_debug_mode", FieldKind::Bool, FieldDefault::Bool(true)),
        ],
    },
    SectionSpec {
        name: PUBLIC_STORE_SECTION,
        presence: SectionPresence::CreateWithDefaults,
        fields: &[
            field("storage_class", FieldKind::String, FieldDefault::Str("filestorage")),
            field(
                "base_dir",
                FieldKind::String,
                FieldDefault::Str("%(here)s/user_dev/media/public"),
            ),
            field("base_url", FieldKind::String, FieldDefault::Str("/mgoblin_media/")),
        ],
    },
    SectionSpec {
        name: QUEUE_STORE_SECTION,
        presence: SectionPresence::CreateWithDefaults,
        fields: &[
            field("storage_class", FieldKind::String, FieldDefault::Str("filestorage")),
            field(
                "base_dir",
                FieldKind::String,
                FieldDefault::Str("%(here)s/user_dev/media/queue"),
            ),
            field("base_url", FieldKind::String, FieldDefault::None),
        ],
    },
    SectionSpec {
        name: CACHE_SECTION,
        presence: SectionPresence::Optional,
        fields: &[
            field("type", FieldKind::String, FieldDefault::Str("file")),
            field(
                "data_dir",
                FieldKind::String,
                FieldDefault::Str("%(here)s/user_dev/beaker/cache/data"),
            ),
        ],
    },
];

/// Look up a section by name.
///
/// A literal key wins; otherwise a dotted name such as `beaker.cache` is
/// followed through nested tables.
pub fn section_value<'a>(tree: &'a Table, name: &str) -> Option<&'a Value> {
    if let Some(value) = tree.get(name) {
        return Some(value);
    }
    let mut parts = name.split('.');
    let mut current = tree.get(parts.next()?)?;
    for part in parts {
        current = current.as_table()?.get(part)?;
    }
    Some(current)
}

fn section_value_mut<'a>(tree: &'a mut Table, name: &str) -> Option<&'a mut Value> {
    if tree.contains_key(name) {
        return tree.get_mut(name);
    }
    let mut parts = name.split('.');
    let mut current = tree.get_mut(parts.next()?)?;
    for part in parts {
        current = current.as_table_mut()?.get_mut(part)?;
    }
    Some(current)
}

/// Fill schema defaults for every missing key.
///
/// Values of the wrong type are left alone for validation to report.
pub fn apply_defaults(tree: &mut Table) {
    for section in SCHEMA {
        if section_value(tree, section.name).is_none()
            && section.presence == SectionPresence::CreateWithDefaults
        {
            tree.insert(section.name.to_string(), Value::Table(Table::new()));
        }

        let Some(Value::Table(table)) = section_value_mut(tree, section.name) else {
            continue;
        };
        for spec in section.fields {
            if table.contains_key(spec.key) {
                continue;
            }
            if let Some(value) = spec.default.to_value() {
                table.insert(spec.key.to_string(), value);
            }
        }
    }
}

/// Typed view of the `[mediagoblin]` section.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Site title shown in page headers.
    pub html_title: String,

    /// Database URI (`sqlite://...`).
    pub db_uri: String,

    /// Connection pool size.
    pub db_max_connections: u32,

    /// Base path or URL static assets are served from.
    #[serde(default)]
    pub direct_remote_path: Option<String>,

    /// Extra named static domains (e.g. plugin assets).
    #[serde(default)]
    pub direct_remote_paths: BTreeMap<String, String>,

    /// Scratch space for media processing.
    pub workbench_path: PathBuf,

    /// Directory searched before the theme and built-in templates.
    #[serde(default)]
    pub user_template_path: Option<PathBuf>,

    /// Name of the active theme.
    #[serde(default)]
    pub theme: Option<String>,

    /// Directory scanned for installed themes.
    pub theme_install_dir: PathBuf,

    /// Enabled media types; each brings its own tables.
    pub media_types: Vec<String>,

    pub allow_registration: bool,

    pub email_sender_address: String,

    pub email_debug_mode: bool,
}
