//! Shared helpers for startup integration tests.

use std::fs;
use std::path::{Path, PathBuf};

use goblin_init::config::load_config;
use goblin_init::db::{self, run_migrations, setup_connection_and_db_from_config, AppliedMigration};

/// A complete config using a file database next to the config file.
pub const FULL_CONFIG: &str = r#"
[mediagoblin]
html_title = "Test Goblin"
db_uri = "sqlite://%(here)s/mediagoblin.db"
direct_remote_path = " /mgoblin_static/ "
workbench_path = "%(here)s/workbench"
user_template_path = "%(here)s/user_templates"
media_types = ["image", "video"]

[mediagoblin.direct_remote_paths]
theme = "/theme_static/"

["storage:publicstore"]
storage_class = "memory"
base_url = "/mgoblin_media/"

["storage:queuestore"]
storage_class = "memory"

["beaker.cache"]
type = "memory"
expire = 300
"#;

/// Write `body` as `mediagoblin.toml` in `dir`.
pub fn write_config(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("mediagoblin.toml");
    fs::write(&path, body).unwrap();
    path
}

/// Run the `dbupdate` steps against the database named in the config.
#[allow(dead_code)]
pub async fn migrate(config_path: &Path) -> Vec<AppliedMigration> {
    let app_config = load_config(config_path).unwrap().app_config().unwrap();
    let models = db::load_models(&app_config).unwrap();
    let (pool, database) = setup_connection_and_db_from_config(&app_config, models)
        .await
        .unwrap();
    let applied = run_migrations(&database).await.unwrap();
    pool.close().await;
    applied
}
