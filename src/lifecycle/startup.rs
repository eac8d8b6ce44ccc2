//! Startup orchestration.
//!
//! # Responsibilities
//! - Load and validate configuration
//! - Initialize all subsystems in dependency order
//! - Publish each subsystem into the write-once [`ContextBuilder`]
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Subsystems initialize in order, not concurrently
//! - Each step reads its inputs from the builder, so running a step before
//!   its dependency fails with `RegistryError::Unset`

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use sqlx::SqlitePool;

use crate::cache::CacheManager;
use crate::config::schema::{CACHE_SECTION, PUBLIC_STORE_SECTION, QUEUE_STORE_SECTION};
use crate::config::{read_config, AppConfig, GlobalConfig};
use crate::context::{AppContext, ContextBuilder};
use crate::db::{self, check_db_migrations_current, setup_connection_and_db_from_config, Database};
use crate::error::Error;
use crate::observability::metrics;
use crate::staticdirect::get_staticdirector;
use crate::storage::{storage_system_from_config, StorageBackend, StorageRegistry};
use crate::templates::{register_themes, template_loader};
use crate::workbench::WorkbenchManager;

/// Load the config file, refuse it if validation found anything, and
/// publish both the raw tree and the typed application section.
///
/// A path that is not a file fails with `Error::General` before any parsing.
pub fn setup_global_and_app_config(
    config_path: &Path,
    builder: &mut ContextBuilder,
) -> Result<(GlobalConfig, AppConfig), Error> {
    if !config_path.is_file() {
        return Err(Error::General(format!(
            "Config file {} does not exist",
            config_path.display()
        )));
    }
    let (global_config, report) = read_config(config_path)?;
    if !report.is_empty() {
        tracing::error!(
            path = %config_path.display(),
            problems = report.errors().len(),
            "Config validation failed"
        );
        return Err(Error::ImproperlyConfigured(report.to_string()));
    }

    let app_config = global_config.app_config()?;
    builder.set_global_config(global_config.clone())?;
    builder.set_app_config(app_config.clone())?;

    tracing::info!(
        path = %config_path.display(),
        here = %global_config.here().display(),
        html_title = %app_config.html_title,
        "Configuration loaded"
    );
    Ok((global_config, app_config))
}

/// Load models, connect, and refuse to continue unless the schema is current.
pub async fn setup_database(builder: &mut ContextBuilder) -> Result<(SqlitePool, Database), Error> {
    let app_config = builder.app_config()?.clone();

    let models = db::load_models(&app_config)?;
    let (pool, database) = setup_connection_and_db_from_config(&app_config, models).await?;
    check_db_migrations_current(&database).await?;

    builder.set_db_connection(pool.clone())?;
    builder.set_database(database.clone())?;
    Ok((pool, database))
}

/// Build the public and queue stores, each from its own config section.
pub fn setup_storage(
    builder: &mut ContextBuilder,
    registry: &StorageRegistry,
) -> Result<(Arc<dyn StorageBackend>, Arc<dyn StorageBackend>), Error> {
    let global_config = builder.global_config()?;
    let public_section = global_config.require_section(PUBLIC_STORE_SECTION)?.clone();
    let queue_section = global_config.require_section(QUEUE_STORE_SECTION)?.clone();

    let public_store = storage_system_from_config(&public_section, registry)?;
    let queue_store = storage_system_from_config(&queue_section, registry)?;

    tracing::info!(
        public = %public_store.class_name(),
        queue = %queue_store.class_name(),
        "Storage systems configured"
    );

    builder.set_public_store(public_store.clone())?;
    builder.set_queue_store(queue_store.clone())?;
    Ok((public_store, queue_store))
}

pub fn setup_workbench(builder: &mut ContextBuilder) -> Result<WorkbenchManager, Error> {
    let workbench_path = builder.app_config()?.workbench_path.clone();
    let manager = WorkbenchManager::new(workbench_path)?;
    builder.set_workbench_manager(manager.clone())?;
    Ok(manager)
}

/// Configure caching from `[beaker.cache]`, whose keys are passed on
/// under the `cache.` prefix.
pub fn setup_cache(builder: &mut ContextBuilder) -> Result<CacheManager, Error> {
    let section = builder.global_config()?.require_section(CACHE_SECTION)?;
    let manager = CacheManager::from_section(section)?;

    let options = manager.options();
    tracing::info!(
        enabled = options.enabled,
        kind = ?options.kind,
        regions = options.regions.len(),
        "Cache configured"
    );

    builder.set_cache(manager.clone())?;
    Ok(manager)
}

pub fn setup_templates(builder: &mut ContextBuilder) -> Result<(), Error> {
    let app_config = builder.app_config()?;
    let (themes, current_theme) = register_themes(app_config)?;
    let loader = template_loader(app_config.user_template_path.as_deref(), current_theme.as_ref());

    tracing::info!(
        themes = themes.len(),
        theme = current_theme.as_ref().map(|t| t.name.as_str()).unwrap_or("none"),
        search_path = %loader.search_path().join(", "),
        "Template loader configured"
    );

    builder.set_templates(loader)?;
    Ok(())
}

pub fn setup_static_director(builder: &mut ContextBuilder) -> Result<(), Error> {
    let director = get_staticdirector(builder.app_config()?)?;
    builder.set_static_director(director)?;
    Ok(())
}

/// Run every setup step with the built-in storage classes.
pub async fn bootstrap(config_path: &Path) -> Result<AppContext, Error> {
    bootstrap_with(config_path, &StorageRegistry::default()).await
}

/// Run every setup step in order and freeze the result.
///
/// The returned context is not installed globally; callers that want the
/// process-wide handle pass it to [`crate::context::install`].
pub async fn bootstrap_with(
    config_path: &Path,
    storage_classes: &StorageRegistry,
) -> Result<AppContext, Error> {
    let started = Instant::now();
    let mut builder = ContextBuilder::new();

    let step = Instant::now();
    setup_global_and_app_config(config_path, &mut builder)?;
    metrics::record_startup_step("config", step);

    let step = Instant::now();
    setup_database(&mut builder).await?;
    metrics::record_startup_step("database", step);

    let step = Instant::now();
    setup_templates(&mut builder)?;
    metrics::record_startup_step("templates", step);

    let step = Instant::now();
    setup_static_director(&mut builder)?;
    metrics::record_startup_step("staticdirect", step);

    let step = Instant::now();
    setup_storage(&mut builder, storage_classes)?;
    metrics::record_startup_step("storage", step);

    let step = Instant::now();
    setup_workbench(&mut builder)?;
    metrics::record_startup_step("workbench", step);

    let step = Instant::now();
    setup_cache(&mut builder)?;
    metrics::record_startup_step("cache", step);

    let context = builder.build()?;
    metrics::record_startup_step("total", started);
    tracing::info!(elapsed_ms = started.elapsed().as_millis() as u64, "Startup complete");
    Ok(context)
}
