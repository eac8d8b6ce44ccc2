//! Opening the database connection.

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

use crate::config::AppConfig;
use crate::db::{Database, DbError, ModelRegistry};

/// Open the connection pool named by `db_uri`.
///
/// The database file is created if missing. In-memory databases get a
/// single connection, since every sqlite connection would otherwise see its
/// own empty database.
///
/// An in-memory database starts without a schema, so full startup rejects
/// it with `DbError::NotInitialized`. It is only usable by callers that
/// migrate and check through the same returned handle, such as tests and
/// in-process tooling.
pub async fn setup_connection_and_db_from_config(
    app_config: &AppConfig,
    models: ModelRegistry,
) -> Result<(SqlitePool, Database), DbError> {
    let options = SqliteConnectOptions::from_str(&app_config.db_uri)?.create_if_missing(true);

    let max_connections = if app_config.db_uri.contains(":memory:") {
        1
    } else {
        app_config.db_max_connections
    };

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await?;

    tracing::info!(
        db_uri = %app_config.db_uri,
        max_connections,
        migration_sets = models.sets().len(),
        "Database connection established"
    );

    Ok((pool.clone(), Database::new(pool, models)))
}
