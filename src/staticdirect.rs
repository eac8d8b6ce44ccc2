//! Static asset URL director.
//!
//! Maps logical asset paths (`css/base.css`) to the URL they are served
//! from. The default domain comes from `direct_remote_path`; named domains
//! (plugin or theme assets) come from `direct_remote_paths`.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::config::AppConfig;
use crate::Error;

/// Errors resolving a static asset.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StaticError {
    #[error("No static domain named '{0}'")]
    UnknownDomain(String),
}

/// Resolves asset paths against configured base paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticDirect {
    default: String,
    domains: BTreeMap<String, String>,
}

fn normalize_base(base: &str) -> String {
    base.trim().trim_end_matches('/').to_string()
}

fn join(base: &str, path: &str) -> String {
    format!("{}/{}", base, path.trim_start_matches('/'))
}

impl StaticDirect {
    /// Director for a single base path.
    pub fn new(base: &str) -> Self {
        Self {
            default: normalize_base(base),
            domains: BTreeMap::new(),
        }
    }

    /// Add a named domain.
    pub fn with_domain(mut self, name: impl Into<String>, base: &str) -> Self {
        self.domains.insert(name.into(), normalize_base(base));
        self
    }

    /// URL for an asset on the default domain.
    pub fn url_for(&self, path: &str) -> String {
        join(&self.default, path)
    }

    /// URL for an asset on a named domain.
    pub fn url_for_domain(&self, domain: &str, path: &str) -> Result<String, StaticError> {
        self.domains
            .get(domain)
            .map(|base| join(base, path))
            .ok_or_else(|| StaticError::UnknownDomain(domain.to_string()))
    }
}

/// Build the director from the application config.
///
/// A missing `direct_remote_path` fails here rather than on the first
/// request that renders an asset link.
pub fn get_staticdirector(app_config: &AppConfig) -> Result<StaticDirect, Error> {
    let base = app_config.direct_remote_path.as_deref().ok_or_else(|| {
        Error::ImproperlyConfigured(
            "One of direct_remote_path or direct_remote_paths must be provided".to_string(),
        )
    })?;

    let director = app_config
        .direct_remote_paths
        .iter()
        .fold(StaticDirect::new(base), |director, (name, path)| {
            director.with_domain(name.clone(), path)
        });
    Ok(director)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;
    use std::path::Path;

    fn app_config(text: &str) -> AppConfig {
        let (config, report) = parse_config(text, Path::new("/srv")).unwrap();
        assert!(report.is_empty(), "{}", report);
        config.app_config().unwrap()
    }

    #[test]
    fn test_missing_direct_remote_path() {
        let config = app_config("[mediagoblin]\n");
        let err = get_staticdirector(&config).unwrap_err();
        assert!(err.is_improperly_configured());
    }

    #[test]
    fn test_base_is_trimmed() {
        let config = app_config("[mediagoblin]\ndirect_remote_path = \" /media/ \"\n");
        let director = get_staticdirector(&config).unwrap();
        assert_eq!(director.url_for("foo.png"), "/media/foo.png");
        assert_eq!(director.url_for("/css/base.css"), "/media/css/base.css");
    }

    #[test]
    fn test_absolute_base() {
        let director = StaticDirect::new("https://static.example.org/goblin/");
        assert_eq!(
            director.url_for("images/logo.png"),
            "https://static.example.org/goblin/images/logo.png"
        );
    }

    #[test]
    fn test_named_domains() {
        let config = app_config(
            r#"
            [mediagoblin]
            direct_remote_path = "/mgoblin_static/"

            [mediagoblin.direct_remote_paths]
            theme = "/theme_static/"
            "#,
        );
        let director = get_staticdirector(&config).unwrap();
        assert_eq!(
            director.url_for_domain("theme", "css/theme.css").unwrap(),
            "/theme_static/css/theme.css"
        );
        assert_eq!(
            director.url_for_domain("plugin", "x.js"),
            Err(StaticError::UnknownDomain("plugin".into()))
        );
    }
}
