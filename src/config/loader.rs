//! Configuration loading from disk.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use toml::{Table, Value};

use crate::config::global::{interpolate_here, GlobalConfig};
use crate::config::schema::apply_defaults;
use crate::config::validation::{validate_config, ValidationReport};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid TOML.
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// The file parsed but failed validation.
    #[error("{0}")]
    Invalid(ValidationReport),

    /// A section a setup step needs is absent.
    #[error("Config section [{0}] is missing")]
    MissingSection(String),

    /// A section could not be turned into its typed form.
    #[error("Config section [{section}] is malformed: {source}")]
    Section {
        section: String,
        #[source]
        source: toml::de::Error,
    },
}

/// Parse configuration text.
///
/// Returns the tree together with the validation report; an empty report
/// means the configuration is usable. `here` is what `%(here)s` expands to.
pub fn parse_config(
    text: &str,
    here: &Path,
) -> Result<(GlobalConfig, ValidationReport), ConfigError> {
    parse_with_source(text, here, None)
}

/// Read and parse a configuration file without failing on validation errors.
pub fn read_config(path: &Path) -> Result<(GlobalConfig, ValidationReport), ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let here = config_dir(path);
    tracing::debug!(path = %path.display(), here = %here.display(), "Read config file");
    parse_with_source(&content, &here, Some(path.to_path_buf()))
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<GlobalConfig, ConfigError> {
    let (config, report) = read_config(path)?;
    if report.is_empty() {
        Ok(config)
    } else {
        Err(ConfigError::Invalid(report))
    }
}

fn parse_with_source(
    text: &str,
    here: &Path,
    source: Option<PathBuf>,
) -> Result<(GlobalConfig, ValidationReport), ConfigError> {
    let mut tree: Table = toml::from_str(text)?;
    apply_defaults(&mut tree);

    let report = match validate_config(&tree) {
        Ok(()) => ValidationReport::default(),
        Err(errors) => ValidationReport::new(errors),
    };

    let here_str = here.to_string_lossy();
    tree.iter_mut()
        .for_each(|(_, value): (_, &mut Value)| interpolate_here(value, &here_str));

    Ok((GlobalConfig::new(tree, here.to_path_buf(), source), report))
}

fn config_dir(path: &Path) -> PathBuf {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::canonicalize(&parent).unwrap_or(parent)
}
