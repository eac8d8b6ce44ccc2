//! Application context shared with request handlers.
//!
//! # Data Flow
//! ```text
//! setup steps ──set_*──▶ ContextBuilder (write-once slots)
//!                              │ build()
//!                              ▼
//!                         AppContext (immutable)
//!                              │ install()
//!                              ▼
//!                  process-wide Arc<AppContext>
//! ```
//!
//! # Design Decisions
//! - Slots are written once; a second write is an error, not an overwrite
//! - The frozen context has getters only
//! - The global install point accepts one context per process; tests build
//!   their own context instead of resetting global state

pub mod builder;

use std::sync::{Arc, OnceLock};

use sqlx::SqlitePool;
use thiserror::Error;

use crate::cache::CacheManager;
use crate::config::{AppConfig, GlobalConfig};
use crate::db::Database;
use crate::staticdirect::StaticDirect;
use crate::storage::StorageBackend;
use crate::templates::TemplateLoader;
use crate::workbench::WorkbenchManager;

pub use builder::ContextBuilder;

/// Errors from the startup registry.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// A setup step tried to overwrite a published value.
    #[error("Registry slot '{0}' is already set")]
    AlreadySet(&'static str),

    /// A setup step ran before the step it depends on.
    #[error("Registry slot '{0}' has not been set")]
    Unset(&'static str),

    #[error("An application context is already installed for this process")]
    AlreadyInstalled,
}

/// Everything request handlers need, built once at startup.
#[derive(Debug)]
pub struct AppContext {
    pub(crate) app_config: AppConfig,
    pub(crate) global_config: GlobalConfig,
    pub(crate) db_connection: SqlitePool,
    pub(crate) database: Database,
    pub(crate) public_store: Arc<dyn StorageBackend>,
    pub(crate) queue_store: Arc<dyn StorageBackend>,
    pub(crate) workbench_manager: WorkbenchManager,
    pub(crate) cache: CacheManager,
    pub(crate) templates: TemplateLoader,
    pub(crate) static_director: StaticDirect,
}

impl AppContext {
    pub fn app_config(&self) -> &AppConfig {
        &self.app_config
    }

    pub fn global_config(&self) -> &GlobalConfig {
        &self.global_config
    }

    pub fn db_connection(&self) -> &SqlitePool {
        &self.db_connection
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    pub fn public_store(&self) -> &Arc<dyn StorageBackend> {
        &self.public_store
    }

    pub fn queue_store(&self) -> &Arc<dyn StorageBackend> {
        &self.queue_store
    }

    pub fn workbench_manager(&self) -> &WorkbenchManager {
        &self.workbench_manager
    }

    pub fn cache(&self) -> &CacheManager {
        &self.cache
    }

    pub fn templates(&self) -> &TemplateLoader {
        &self.templates
    }

    pub fn static_director(&self) -> &StaticDirect {
        &self.static_director
    }
}

static GLOBAL_CONTEXT: OnceLock<Arc<AppContext>> = OnceLock::new();

/// Publish the context for the rest of the process.
pub fn install(context: AppContext) -> Result<Arc<AppContext>, RegistryError> {
    let context = Arc::new(context);
    GLOBAL_CONTEXT
        .set(context.clone())
        .map_err(|_| RegistryError::AlreadyInstalled)?;
    tracing::debug!("Application context installed");
    Ok(context)
}

/// The installed context, if startup has finished.
pub fn global() -> Option<Arc<AppContext>> {
    GLOBAL_CONTEXT.get().cloned()
}
