//! Startup error types.
//!
//! Two failure kinds belong to startup itself: a general error and the more
//! specific [`Error::ImproperlyConfigured`]. Errors raised by collaborators
//! (database, storage, cache, templates) pass through unchanged so that the
//! operator sees the original cause.

use thiserror::Error;

use crate::cache::CacheError;
use crate::config::loader::ConfigError;
use crate::context::RegistryError;
use crate::db::DbError;
use crate::storage::StorageError;
use crate::templates::TemplateError;

/// Errors that abort application startup.
#[derive(Debug, Error)]
pub enum Error {
    /// Startup failure with no more specific kind (missing config file).
    #[error("{0}")]
    General(String),

    /// The configuration is unusable (validation report, missing settings).
    #[error("Improperly configured: {0}")]
    ImproperlyConfigured(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Database(#[from] DbError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Return true for configuration problems found before any subsystem ran.
    pub fn is_improperly_configured(&self) -> bool {
        matches!(self, Error::ImproperlyConfigured(_))
    }
}
