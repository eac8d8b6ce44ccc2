//! Configuration validation.
//!
//! # Responsibilities
//! - Check every known key against its expected type
//! - Check required sections are present and are tables
//! - Semantic checks serde cannot express (pool size, absolute URLs)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is a pure function over the parsed tree
//! - Unknown keys are allowed; backends read their own extra options

use std::fmt;

use toml::{Table, Value};
use url::Url;

use crate::config::schema::{
    section_value, SectionPresence, APP_SECTION, PUBLIC_STORE_SECTION, QUEUE_STORE_SECTION,
    SCHEMA,
};

/// A single problem found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub section: String,
    pub key: Option<String>,
    pub message: String,
}

impl ValidationError {
    fn section(section: &str, message: impl Into<String>) -> Self {
        Self {
            section: section.to_string(),
            key: None,
            message: message.into(),
        }
    }

    fn key(section: &str, key: &str, message: impl Into<String>) -> Self {
        Self {
            section: section.to_string(),
            key: Some(key.to_string()),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.key {
            Some(key) => write!(f, "[{}] {}: {}", self.section, key, self.message),
            None => write!(f, "[{}]: {}", self.section, self.message),
        }
    }
}

/// Every problem found while validating one config file.
///
/// Renders as a multi-line report suitable for showing to an operator; an
/// empty report renders as an empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    errors: Vec<ValidationError>,
}

impl ValidationReport {
    pub fn new(errors: Vec<ValidationError>) -> Self {
        Self { errors }
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.errors.is_empty() {
            return Ok(());
        }
        writeln!(f, "There were validation problems loading this config file:")?;
        write!(f, "--------------------------------------------------------")?;
        for err in &self.errors {
            write!(f, "\n{}", err)?;
        }
        Ok(())
    }
}

/// Validate a parsed (and defaulted) configuration tree.
pub fn validate_config(tree: &Table) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    for spec in SCHEMA {
        let table = match section_value(tree, spec.name) {
            Some(Value::Table(table)) => table,
            Some(other) => {
                errors.push(ValidationError::section(
                    spec.name,
                    format!("expected a section, found {}", other.type_str()),
                ));
                continue;
            }
            None => {
                if spec.presence == SectionPresence::Required {
                    errors.push(ValidationError::section(spec.name, "section is missing"));
                }
                continue;
            }
        };

        for field in spec.fields {
            if let Some(value) = table.get(field.key) {
                if !field.kind.accepts(value) {
                    errors.push(ValidationError::key(
                        spec.name,
                        field.key,
                        format!("expected {}, found {}", field.kind.describe(), value.type_str()),
                    ));
                }
            }
        }
    }

    check_app_section(tree, &mut errors);
    for store in [PUBLIC_STORE_SECTION, QUEUE_STORE_SECTION] {
        check_base_url(tree, store, &mut errors);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_app_section(tree: &Table, errors: &mut Vec<ValidationError>) {
    let Some(app) = section_value(tree, APP_SECTION).and_then(Value::as_table) else {
        return;
    };

    if let Some(n) = app.get("db_max_connections").and_then(Value::as_integer) {
        if n < 1 || n > u32::MAX as i64 {
            errors.push(ValidationError::key(
                APP_SECTION,
                "db_max_connections",
                format!("must be a positive number, got {}", n),
            ));
        }
    }

    if let Some(paths) = app.get("direct_remote_paths") {
        let well_formed = paths
            .as_table()
            .map(|t| t.values().all(Value::is_str))
            .unwrap_or(false);
        if !well_formed {
            errors.push(ValidationError::key(
                APP_SECTION,
                "direct_remote_paths",
                "expected a table of domain = \"path\" strings",
            ));
        }
    }
}

fn check_base_url(tree: &Table, section: &str, errors: &mut Vec<ValidationError>) {
    let base_url = section_value(tree, section)
        .and_then(Value::as_table)
        .and_then(|t| t.get("base_url"))
        .and_then(Value::as_str);

    if let Some(base_url) = base_url {
        if base_url.contains("://") {
            if let Err(e) = Url::parse(base_url) {
                errors.push(ValidationError::key(
                    section,
                    "base_url",
                    format!("not a valid URL ({})", e),
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::apply_defaults;

    fn parse(text: &str) -> Table {
        let mut tree: Table = toml::from_str(text).unwrap();
        apply_defaults(&mut tree);
        tree
    }

    #[test]
    fn test_valid_minimal_config() {
        let tree = parse("[mediagoblin]\n");
        assert!(validate_config(&tree).is_ok());
    }

    #[test]
    fn test_reports_all_errors() {
        let tree = parse(
            r#"
            [mediagoblin]
            allow_registration = "maybe"
            media_types = 5
            db_max_connections = 0

            ["storage:publicstore"]
            base_dir = 42
            base_url = "http://exa mple.com/"
            "#,
        );
        let errors = validate_config(&tree).unwrap_err();
        assert_eq!(errors.len(), 5, "{:?}", errors);

        let rendered: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        assert!(rendered.contains(&"[mediagoblin] allow_registration: expected a boolean, found string".to_string()));
        assert!(rendered.contains(&"[mediagoblin] media_types: expected a list of strings, found integer".to_string()));
        assert!(rendered.contains(&"[storage:publicstore] base_dir: expected a string, found integer".to_string()));
    }

    #[test]
    fn test_missing_required_section() {
        let tree = parse("[other]\nkey = 1\n");
        let errors = validate_config(&tree).unwrap_err();
        assert_eq!(errors, vec![ValidationError::section("mediagoblin", "section is missing")]);
    }

    #[test]
    fn test_section_must_be_table() {
        let tree = parse("mediagoblin = 3\n");
        let errors = validate_config(&tree).unwrap_err();
        assert_eq!(errors[0].to_string(), "[mediagoblin]: expected a section, found integer");
    }

    #[test]
    fn test_report_rendering() {
        assert_eq!(ValidationReport::default().to_string(), "");

        let report = ValidationReport::new(vec![
            ValidationError::key("mediagoblin", "theme", "expected a string, found integer"),
            ValidationError::section("beaker.cache", "expected a section, found string"),
        ]);
        let text = report.to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[2], "[mediagoblin] theme: expected a string, found integer");
        assert_eq!(lines[3], "[beaker.cache]: expected a section, found string");
    }
}
