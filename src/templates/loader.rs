//! Template sources.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::templates::{TemplateError, TemplateSource};

/// Templates compiled into the binary.
const BUILTIN_TEMPLATES: &[(&str, &str)] = &[
    (
        "mediagoblin/base.html",
        include_str!("../../templates/mediagoblin/base.html"),
    ),
    (
        "mediagoblin/root.html",
        include_str!("../../templates/mediagoblin/root.html"),
    ),
    (
        "mediagoblin/404.html",
        include_str!("../../templates/mediagoblin/404.html"),
    ),
];

/// Split a template name into path segments.
///
/// Rejects absolute names and `..` so a name can never leave its source.
fn split_template_name(name: &str) -> Result<Vec<&str>, TemplateError> {
    if name.starts_with('/') || name.contains('\\') {
        return Err(TemplateError::InvalidName(name.to_string()));
    }
    let mut segments = Vec::new();
    for segment in name.split('/') {
        match segment {
            ".." => return Err(TemplateError::InvalidName(name.to_string())),
            "" | "." => continue,
            s => segments.push(s),
        }
    }
    if segments.is_empty() {
        return Err(TemplateError::InvalidName(name.to_string()));
    }
    Ok(segments)
}

/// Templates in a directory on disk.
#[derive(Debug, Clone)]
pub struct FileSystemSource {
    dir: PathBuf,
}

impl FileSystemSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl TemplateSource for FileSystemSource {
    fn load(&self, name: &str) -> Result<Option<String>, TemplateError> {
        let path = split_template_name(name)?
            .into_iter()
            .fold(self.dir.clone(), |acc, s| acc.join(s));

        match fs::read_to_string(&path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(TemplateError::Io { path, source }),
        }
    }

    fn describe(&self) -> String {
        format!("filesystem:{}", self.dir.display())
    }
}

/// Templates held in memory; the built-in set by default.
#[derive(Debug, Clone)]
pub struct BundledSource {
    templates: Vec<(String, String)>,
    label: String,
}

impl BundledSource {
    /// The application's own templates.
    pub fn builtin() -> Self {
        Self {
            templates: BUILTIN_TEMPLATES
                .iter()
                .map(|(name, text)| (name.to_string(), text.to_string()))
                .collect(),
            label: "builtin".to_string(),
        }
    }

    /// An arbitrary set of named templates.
    pub fn from_entries<I, N, T>(label: impl Into<String>, entries: I) -> Self
    where
        I: IntoIterator<Item = (N, T)>,
        N: Into<String>,
        T: Into<String>,
    {
        Self {
            templates: entries
                .into_iter()
                .map(|(n, t)| (n.into(), t.into()))
                .collect(),
            label: label.into(),
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.templates.iter().map(|(name, _)| name.as_str())
    }
}

impl TemplateSource for BundledSource {
    fn load(&self, name: &str) -> Result<Option<String>, TemplateError> {
        let wanted = split_template_name(name)?.join("/");
        Ok(self
            .templates
            .iter()
            .find(|(n, _)| *n == wanted)
            .map(|(_, text)| text.clone()))
    }

    fn describe(&self) -> String {
        self.label.clone()
    }
}

/// Tries each source in order; the first one that has the template wins.
#[derive(Debug, Default)]
pub struct ChoiceLoader {
    sources: Vec<Box<dyn TemplateSource>>,
}

impl ChoiceLoader {
    pub fn new(sources: Vec<Box<dyn TemplateSource>>) -> Self {
        Self { sources }
    }

    pub fn sources(&self) -> &[Box<dyn TemplateSource>] {
        &self.sources
    }
}

impl TemplateSource for ChoiceLoader {
    fn load(&self, name: &str) -> Result<Option<String>, TemplateError> {
        for source in &self.sources {
            if let Some(text) = source.load(name)? {
                tracing::trace!(template = %name, source = %source.describe(), "Template resolved");
                return Ok(Some(text));
            }
        }
        Ok(None)
    }

    fn describe(&self) -> String {
        self.sources
            .iter()
            .map(|s| s.describe())
            .collect::<Vec<_>>()
            .join(" -> ")
    }
}
