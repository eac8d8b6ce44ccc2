//! Template lookup.
//!
//! # Data Flow
//! ```text
//! user_template_path ─┐
//! theme templates_dir ┼─▶ ChoiceLoader (first match wins) ─▶ renderer
//! built-in templates ─┘
//! ```
//!
//! # Design Decisions
//! - Precedence is an ordered list, never a merge
//! - Without overrides the chain collapses to the built-in source
//! - Rendering itself lives elsewhere; this module only finds sources

pub mod loader;
pub mod theme;

use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub use loader::{BundledSource, ChoiceLoader, FileSystemSource};
pub use theme::{register_themes, Theme, ThemeRegistry};

/// Errors raised while looking up templates or themes.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// Template names may not climb out of their directory.
    #[error("Invalid template name '{0}'")]
    InvalidName(String),

    #[error("Failed to read template {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid theme manifest {path}: {source}")]
    ThemeManifest {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Somewhere templates can be loaded from.
pub trait TemplateSource: Send + Sync + fmt::Debug {
    /// Load a template by name (`mediagoblin/root.html`), `None` if absent.
    fn load(&self, name: &str) -> Result<Option<String>, TemplateError>;

    /// Short description for logs and diagnostics.
    fn describe(&self) -> String;
}

/// The loader handed to the renderer.
#[derive(Debug)]
pub enum TemplateLoader {
    /// Only the templates compiled into the binary.
    Builtin(BundledSource),
    /// User and/or theme overrides in front of the built-ins.
    Chain(ChoiceLoader),
}

impl TemplateLoader {
    /// Sources in lookup order.
    pub fn search_path(&self) -> Vec<String> {
        match self {
            TemplateLoader::Builtin(source) => vec![source.describe()],
            TemplateLoader::Chain(chain) => chain.sources().iter().map(|s| s.describe()).collect(),
        }
    }
}

impl TemplateSource for TemplateLoader {
    fn load(&self, name: &str) -> Result<Option<String>, TemplateError> {
        match self {
            TemplateLoader::Builtin(source) => source.load(name),
            TemplateLoader::Chain(chain) => chain.load(name),
        }
    }

    fn describe(&self) -> String {
        self.search_path().join(" -> ")
    }
}

/// Build the template lookup chain.
///
/// With a user template path or a theme, the chain is: user path, theme
/// templates (if the theme has any), built-ins. With neither, only the
/// built-ins are used. An empty user template path counts as unset.
pub fn template_loader(user_template_path: Option<&Path>, current_theme: Option<&Theme>) -> TemplateLoader {
    let user_template_path = user_template_path.filter(|p| !p.as_os_str().is_empty());
    if user_template_path.is_none() && current_theme.is_none() {
        return TemplateLoader::Builtin(BundledSource::builtin());
    }

    let mut sources: Vec<Box<dyn TemplateSource>> = Vec::new();
    if let Some(path) = user_template_path {
        sources.push(Box::new(FileSystemSource::new(path)));
    }
    if let Some(dir) = current_theme.and_then(|t| t.templates_dir.as_deref()) {
        sources.push(Box::new(FileSystemSource::new(dir)));
    }
    sources.push(Box::new(BundledSource::builtin()));

    TemplateLoader::Chain(ChoiceLoader::new(sources))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn theme_with_templates(dir: Option<&Path>) -> Theme {
        Theme {
            name: "airy".into(),
            description: None,
            dir: PathBuf::from("/themes/airy"),
            templates_dir: dir.map(Path::to_path_buf),
            assets_dir: None,
        }
    }

    #[test]
    fn test_builtin_only() {
        let loader = template_loader(None, None);
        assert!(matches!(loader, TemplateLoader::Builtin(_)));
        assert_eq!(loader.search_path(), vec!["builtin".to_string()]);
    }

    #[test]
    fn test_empty_user_path_is_unset() {
        let loader = template_loader(Some(Path::new("")), None);
        assert!(matches!(loader, TemplateLoader::Builtin(_)));

        let theme = theme_with_templates(Some(Path::new("/themes/airy/templates")));
        let loader = template_loader(Some(Path::new("")), Some(&theme));
        assert_eq!(
            loader.search_path(),
            vec!["filesystem:/themes/airy/templates".to_string(), "builtin".to_string()]
        );
    }

    #[test]
    fn test_full_chain_order() {
        let theme = theme_with_templates(Some(Path::new("/themes/airy/templates")));
        let loader = template_loader(Some(Path::new("/srv/user_templates")), Some(&theme));
        assert_eq!(
            loader.search_path(),
            vec![
                "filesystem:/srv/user_templates".to_string(),
                "filesystem:/themes/airy/templates".to_string(),
                "builtin".to_string(),
            ]
        );
    }

    #[test]
    fn test_theme_without_templates() {
        let theme = theme_with_templates(None);
        let loader = template_loader(None, Some(&theme));
        assert!(matches!(loader, TemplateLoader::Chain(_)));
        assert_eq!(loader.search_path(), vec!["builtin".to_string()]);
    }

    #[test]
    fn test_user_override_wins() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("mediagoblin")).unwrap();
        std::fs::write(dir.path().join("mediagoblin").join("root.html"), "custom root").unwrap();

        let loader = template_loader(Some(dir.path()), None);
        assert_eq!(loader.load("mediagoblin/root.html").unwrap().as_deref(), Some("custom root"));
        // Not overridden, falls through to the built-in copy.
        let base = loader.load("mediagoblin/base.html").unwrap().unwrap();
        assert!(base.contains("<html>"));
        assert!(loader.load("mediagoblin/missing.html").unwrap().is_none());
    }
}
