//! Installed themes.
//!
//! A theme is a directory under `theme_install_dir` containing a
//! `theme.toml` manifest, and optionally `templates/` and `assets/`.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::config::AppConfig;
use crate::templates::TemplateError;

/// File that marks a directory as a theme.
pub const THEME_MANIFEST: &str = "theme.toml";

#[derive(Debug, Default, Deserialize)]
struct ThemeManifest {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

/// One installed theme.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Theme {
    pub name: String,
    pub description: Option<String>,
    pub dir: PathBuf,
    pub templates_dir: Option<PathBuf>,
    pub assets_dir: Option<PathBuf>,
}

impl Theme {
    fn from_dir(dir: &Path) -> Result<Option<Theme>, TemplateError> {
        let manifest_path = dir.join(THEME_MANIFEST);
        let text = match fs::read_to_string(&manifest_path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(TemplateError::Io {
                    path: manifest_path,
                    source,
                })
            }
        };
        let manifest: ThemeManifest =
            toml::from_str(&text).map_err(|source| TemplateError::ThemeManifest {
                path: manifest_path,
                source,
            })?;

        let dir_name = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let existing = |sub: &str| Some(dir.join(sub)).filter(|p| p.is_dir());

        Ok(Some(Theme {
            name: manifest.name.unwrap_or(dir_name),
            description: manifest.description,
            dir: dir.to_path_buf(),
            templates_dir: existing("templates"),
            assets_dir: existing("assets"),
        }))
    }
}

/// Themes found under the install directory, by name.
#[derive(Debug, Clone, Default)]
pub struct ThemeRegistry {
    themes: BTreeMap<String, Theme>,
}

impl ThemeRegistry {
    pub fn get(&self, name: &str) -> Option<&Theme> {
        self.themes.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.themes.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.themes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.themes.is_empty()
    }

    /// Scan a directory for themes. A missing directory yields no themes.
    pub fn scan(install_dir: &Path) -> Result<Self, TemplateError> {
        let mut registry = Self::default();
        let entries = match fs::read_dir(install_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(dir = %install_dir.display(), "No theme directory");
                return Ok(registry);
            }
            Err(source) => {
                return Err(TemplateError::Io {
                    path: install_dir.to_path_buf(),
                    source,
                })
            }
        };

        for entry in entries {
            let entry = entry.map_err(|source| TemplateError::Io {
                path: install_dir.to_path_buf(),
                source,
            })?;
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            if let Some(theme) = Theme::from_dir(&path)? {
                tracing::debug!(theme = %theme.name, dir = %path.display(), "Registered theme");
                registry.themes.insert(theme.name.clone(), theme);
            }
        }
        Ok(registry)
    }
}

/// Register installed themes and pick the configured one.
///
/// A configured theme that is not installed is logged and ignored.
pub fn register_themes(
    app_config: &AppConfig,
) -> Result<(ThemeRegistry, Option<Theme>), TemplateError> {
    let registry = ThemeRegistry::scan(&app_config.theme_install_dir)?;

    let current = match app_config.theme.as_deref().filter(|name| !name.is_empty()) {
        Some(name) => {
            let theme = registry.get(name).cloned();
            if theme.is_none() {
                tracing::warn!(
                    theme = %name,
                    install_dir = %app_config.theme_install_dir.display(),
                    "Configured theme is not installed; using default templates"
                );
            }
            theme
        }
        None => None,
    };

    Ok((registry, current))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn install(root: &Path, dir: &str, manifest: &str, with_templates: bool) {
        let theme_dir = root.join(dir);
        fs::create_dir_all(&theme_dir).unwrap();
        fs::write(theme_dir.join(THEME_MANIFEST), manifest).unwrap();
        if with_templates {
            fs::create_dir_all(theme_dir.join("templates")).unwrap();
        }
    }

    #[test]
    fn test_scan_themes() {
        let root = tempfile::tempdir().unwrap();
        install(root.path(), "airy", "name = \"airy\"\ndescription = \"Light\"\n", true);
        install(root.path(), "sandy", "", false);
        fs::create_dir_all(root.path().join("not_a_theme")).unwrap();

        let registry = ThemeRegistry::scan(root.path()).unwrap();
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["airy", "sandy"]);

        let airy = registry.get("airy").unwrap();
        assert_eq!(airy.description.as_deref(), Some("Light"));
        assert_eq!(airy.templates_dir, Some(root.path().join("airy").join("templates")));
        assert!(airy.assets_dir.is_none());
        assert!(registry.get("sandy").unwrap().templates_dir.is_none());
    }

    #[test]
    fn test_empty_theme_name_is_unset() {
        let root = tempfile::tempdir().unwrap();
        install(root.path(), "airy", "", true);
        let text = format!(
            "[mediagoblin]\ntheme = \"\"\ntheme_install_dir = \"{}\"\n",
            root.path().display()
        );
        let (config, report) = crate::config::parse_config(&text, root.path()).unwrap();
        assert!(report.is_empty());

        let (registry, current) = register_themes(&config.app_config().unwrap()).unwrap();
        assert_eq!(registry.len(), 1);
        assert!(current.is_none());
    }

    #[test]
    fn test_missing_install_dir() {
        let registry = ThemeRegistry::scan(Path::new("/no/such/themes")).unwrap();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_bad_manifest() {
        let root = tempfile::tempdir().unwrap();
        install(root.path(), "broken", "name = [", false);
        assert!(matches!(
            ThemeRegistry::scan(root.path()),
            Err(TemplateError::ThemeManifest { .. })
        ));
    }
}
