//! Write-once registry filled in by the setup steps.

use std::sync::Arc;

use sqlx::SqlitePool;

use crate::cache::CacheManager;
use crate::config::{AppConfig, GlobalConfig};
use crate::context::{AppContext, RegistryError};
use crate::db::Database;
use crate::staticdirect::StaticDirect;
use crate::storage::StorageBackend;
use crate::templates::TemplateLoader;
use crate::workbench::WorkbenchManager;

fn set_once<T>(slot: &mut Option<T>, name: &'static str, value: T) -> Result<(), RegistryError> {
    if slot.is_some() {
        return Err(RegistryError::AlreadySet(name));
    }
    *slot = Some(value);
    Ok(())
}

fn require<T>(slot: Option<T>, name: &'static str) -> Result<T, RegistryError> {
    slot.ok_or(RegistryError::Unset(name))
}

/// Slots populated during startup.
///
/// Each slot accepts exactly one value. Later steps read what earlier
/// steps published through the getters, which fail on an empty slot.
#[derive(Debug, Default)]
pub struct ContextBuilder {
    app_config: Option<AppConfig>,
    global_config: Option<GlobalConfig>,
    db_connection: Option<SqlitePool>,
    database: Option<Database>,
    public_store: Option<Arc<dyn StorageBackend>>,
    queue_store: Option<Arc<dyn StorageBackend>>,
    workbench_manager: Option<WorkbenchManager>,
    cache: Option<CacheManager>,
    templates: Option<TemplateLoader>,
    static_director: Option<StaticDirect>,
}

impl ContextBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_app_config(&mut self, value: AppConfig) -> Result<(), RegistryError> {
        set_once(&mut self.app_config, "app_config", value)
    }

    pub fn set_global_config(&mut self, value: GlobalConfig) -> Result<(), RegistryError> {
        set_once(&mut self.global_config, "global_config", value)
    }

    pub fn set_db_connection(&mut self, value: SqlitePool) -> Result<(), RegistryError> {
        set_once(&mut self.db_connection, "db_connection", value)
    }

    pub fn set_database(&mut self, value: Database) -> Result<(), RegistryError> {
        set_once(&mut self.database, "database", value)
    }

    pub fn set_public_store(&mut self, value: Arc<dyn StorageBackend>) -> Result<(), RegistryError> {
        set_once(&mut self.public_store, "public_store", value)
    }

    pub fn set_queue_store(&mut self, value: Arc<dyn StorageBackend>) -> Result<(), RegistryError> {
        set_once(&mut self.queue_store, "queue_store", value)
    }

    pub fn set_workbench_manager(&mut self, value: WorkbenchManager) -> Result<(), RegistryError> {
        set_once(&mut self.workbench_manager, "workbench_manager", value)
    }

    pub fn set_cache(&mut self, value: CacheManager) -> Result<(), RegistryError> {
        set_once(&mut self.cache, "cache", value)
    }

    pub fn set_templates(&mut self, value: TemplateLoader) -> Result<(), RegistryError> {
        set_once(&mut self.templates, "templates", value)
    }

    pub fn set_static_director(&mut self, value: StaticDirect) -> Result<(), RegistryError> {
        set_once(&mut self.static_director, "static_director", value)
    }

    pub fn app_config(&self) -> Result<&AppConfig, RegistryError> {
        self.app_config.as_ref().ok_or(RegistryError::Unset("app_config"))
    }

    pub fn global_config(&self) -> Result<&GlobalConfig, RegistryError> {
        self.global_config.as_ref().ok_or(RegistryError::Unset("global_config"))
    }

    pub fn database(&self) -> Result<&Database, RegistryError> {
        self.database.as_ref().ok_or(RegistryError::Unset("database"))
    }

    pub fn public_store(&self) -> Result<&Arc<dyn StorageBackend>, RegistryError> {
        self.public_store.as_ref().ok_or(RegistryError::Unset("public_store"))
    }

    pub fn queue_store(&self) -> Result<&Arc<dyn StorageBackend>, RegistryError> {
        self.queue_store.as_ref().ok_or(RegistryError::Unset("queue_store"))
    }

    /// Freeze the registry. Every slot must be filled.
    pub fn build(self) -> Result<AppContext, RegistryError> {
        Ok(AppContext {
            app_config: require(self.app_config, "app_config")?,
            global_config: require(self.global_config, "global_config")?,
            db_connection: require(self.db_connection, "db_connection")?,
            database: require(self.database, "database")?,
            public_store: require(self.public_store, "public_store")?,
            queue_store: require(self.queue_store, "queue_store")?,
            workbench_manager: require(self.workbench_manager, "workbench_manager")?,
            cache: require(self.cache, "cache")?,
            templates: require(self.templates, "templates")?,
            static_director: require(self.static_director, "static_director")?,
        })
    }
}
