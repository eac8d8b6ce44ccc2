//! Database subsystem.
//!
//! # Data Flow
//! ```text
//! AppConfig.media_types
//!     → load_models (core + media type migration sets)
//!     → open.rs (sqlx pool from db_uri)
//!     → migrations.rs (stored version == expected version, per set)
//!     → Database published into the startup context
//! ```
//!
//! # Design Decisions
//! - Models are loaded before connecting: they define the expected schema
//! - Startup never migrates implicitly; `dbupdate` does
//! - Any version mismatch is fatal, behind or ahead

pub mod migrations;
pub mod models;
pub mod open;

use std::collections::BTreeSet;

use sqlx::SqlitePool;
use thiserror::Error;

use crate::config::AppConfig;

pub use migrations::{check_db_migrations_current, run_migrations, AppliedMigration};
pub use models::{Migration, MigrationSet, ModelRegistry};
pub use open::setup_connection_and_db_from_config;

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// `media_types` names a type this build does not know.
    #[error("Unknown media type '{0}' in media_types")]
    UnknownMediaType(String),

    /// No schema version is recorded for a migration set.
    #[error("Database has no schema for '{set}'; run `goblin-init dbupdate`")]
    NotInitialized { set: String },

    /// The database is older than the code.
    #[error("Database schema for '{set}' is at version {stored}, code expects {expected}; run `goblin-init dbupdate`")]
    Behind {
        set: String,
        stored: i64,
        expected: i64,
    },

    /// The database was migrated by newer code.
    #[error("Database schema for '{set}' is at version {stored}, newer than this code's {expected}")]
    Ahead {
        set: String,
        stored: i64,
        expected: i64,
    },
}

/// Database handle: connection pool plus the models it is expected to hold.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
    models: ModelRegistry,
}

impl Database {
    pub fn new(pool: SqlitePool, models: ModelRegistry) -> Self {
        Self { pool, models }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn models(&self) -> &ModelRegistry {
        &self.models
    }
}

/// Load the core models plus those of every enabled media type.
pub fn load_models(app_config: &AppConfig) -> Result<ModelRegistry, DbError> {
    let mut sets = vec![models::CORE_MODELS];
    let mut seen = BTreeSet::new();

    for media_type in &app_config.media_types {
        if !seen.insert(media_type.as_str()) {
            continue;
        }
        let set = models::MEDIA_TYPE_MODELS
            .iter()
            .find(|s| s.name == media_type.as_str())
            .ok_or_else(|| DbError::UnknownMediaType(media_type.clone()))?;
        tracing::debug!(media_type = %media_type, "Loaded media type models");
        sets.push(*set);
    }

    Ok(ModelRegistry::new(sets))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;
    use std::path::Path;

    fn app_config(media_types: &str) -> AppConfig {
        let text = format!("[mediagoblin]\nmedia_types = {}\n", media_types);
        let (config, report) = parse_config(&text, Path::new("/srv")).unwrap();
        assert!(report.is_empty());
        config.app_config().unwrap()
    }

    #[test]
    fn test_load_models() {
        let registry = load_models(&app_config(r#"["image", "video", "image"]"#)).unwrap();
        let names: Vec<&str> = registry.sets().iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["__main__", "image", "video"]);
        assert!(registry.get("audio").is_none());
    }

    #[test]
    fn test_unknown_media_type() {
        let err = load_models(&app_config(r#"["image", "pdf"]"#)).unwrap_err();
        assert!(matches!(err, DbError::UnknownMediaType(t) if t == "pdf"));
    }
}
