//! Schema version tracking.
//!
//! Versions are stored per migration set in `core__migrations`
//! (`name`, `version`).

use std::collections::HashMap;

use sqlx::SqlitePool;

use crate::db::{Database, DbError};
use crate::observability::metrics;

const MIGRATIONS_TABLE: &str = "core__migrations";

/// What `run_migrations` did for one set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedMigration {
    pub set: &'static str,
    pub from: Option<i64>,
    pub to: i64,
}

async fn migrations_table_exists(pool: &SqlitePool) -> Result<bool, DbError> {
    let row: Option<(String,)> =
        sqlx::query_as("SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1")
            .bind(MIGRATIONS_TABLE)
            .fetch_optional(pool)
            .await?;
    Ok(row.is_some())
}

/// Recorded version of every set, empty if nothing was ever migrated.
pub async fn stored_versions(pool: &SqlitePool) -> Result<HashMap<String, i64>, DbError> {
    if !migrations_table_exists(pool).await? {
        return Ok(HashMap::new());
    }
    let rows: Vec<(String, i64)> = sqlx::query_as("SELECT name, version FROM core__migrations")
        .fetch_all(pool)
        .await?;
    Ok(rows.into_iter().collect())
}

/// Fail unless every loaded migration set is exactly at its latest version.
pub async fn check_db_migrations_current(db: &Database) -> Result<(), DbError> {
    let stored = stored_versions(db.pool()).await?;

    for set in db.models().sets() {
        let expected = set.latest();
        match stored.get(set.name).copied() {
            None => {
                return Err(DbError::NotInitialized {
                    set: set.name.to_string(),
                })
            }
            Some(v) if v < expected => {
                return Err(DbError::Behind {
                    set: set.name.to_string(),
                    stored: v,
                    expected,
                })
            }
            Some(v) if v > expected => {
                return Err(DbError::Ahead {
                    set: set.name.to_string(),
                    stored: v,
                    expected,
                })
            }
            Some(_) => {}
        }
    }

    tracing::debug!(sets = db.models().sets().len(), "Database migrations are current");
    Ok(())
}

/// Bring every loaded migration set up to its latest version.
///
/// Each set migrates in its own transaction. A database that is ahead of
/// the code is left untouched and reported as an error.
pub async fn run_migrations(db: &Database) -> Result<Vec<AppliedMigration>, DbError> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS core__migrations (
            name TEXT PRIMARY KEY,
            version INTEGER NOT NULL
        )",
    )
    .execute(db.pool())
    .await?;

    let stored = stored_versions(db.pool()).await?;
    let mut applied = Vec::new();

    for set in db.models().sets() {
        let current = stored.get(set.name).copied();
        let expected = set.latest();
        if let Some(v) = current {
            if v > expected {
                return Err(DbError::Ahead {
                    set: set.name.to_string(),
                    stored: v,
                    expected,
                });
            }
        }

        let pending: Vec<_> = set.pending(current.unwrap_or(0)).collect();
        if pending.is_empty() {
            continue;
        }

        let mut tx = db.pool().begin().await?;
        for migration in &pending {
            tracing::info!(
                set = %set.name,
                version = migration.version,
                description = %migration.description,
                "Applying migration"
            );
            sqlx::raw_sql(migration.sql).execute(&mut *tx).await?;
        }
        sqlx::query(
            "INSERT INTO core__migrations (name, version) VALUES (?1, ?2)
             ON CONFLICT(name) DO UPDATE SET version = excluded.version",
        )
        .bind(set.name)
        .bind(expected)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        metrics::record_migrations_applied(set.name, pending.len());
        applied.push(AppliedMigration {
            set: set.name,
            from: current,
            to: expected,
        });
    }

    Ok(applied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{CORE_MODELS, IMAGE_MODELS};
    use crate::db::ModelRegistry;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn memory_db(models: ModelRegistry) -> Database {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        Database::new(pool, models)
    }

    #[tokio::test]
    async fn test_fresh_database_is_not_initialized() {
        let db = memory_db(ModelRegistry::new(vec![CORE_MODELS])).await;
        let err = check_db_migrations_current(&db).await.unwrap_err();
        assert!(matches!(err, DbError::NotInitialized { set } if set == "__main__"));
    }

    #[tokio::test]
    async fn test_migrate_then_check() {
        let db = memory_db(ModelRegistry::new(vec![CORE_MODELS, IMAGE_MODELS])).await;

        let applied = run_migrations(&db).await.unwrap();
        assert_eq!(
            applied,
            vec![
                AppliedMigration { set: "__main__", from: None, to: 3 },
                AppliedMigration { set: "image", from: None, to: 2 },
            ]
        );
        check_db_migrations_current(&db).await.unwrap();

        // Second run has nothing to do.
        assert!(run_migrations(&db).await.unwrap().is_empty());

        // Tables really exist.
        sqlx::query("INSERT INTO core__users (username) VALUES ('goblin')")
            .execute(db.pool())
            .await
            .unwrap();
        sqlx::query("SELECT exif_all FROM image__mediadata")
            .fetch_all(db.pool())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_behind_and_ahead() {
        let db = memory_db(ModelRegistry::new(vec![CORE_MODELS])).await;
        run_migrations(&db).await.unwrap();

        sqlx::query("UPDATE core__migrations SET version = 1 WHERE name = '__main__'")
            .execute(db.pool())
            .await
            .unwrap();
        let err = check_db_migrations_current(&db).await.unwrap_err();
        assert!(matches!(err, DbError::Behind { stored: 1, expected: 3, .. }));

        sqlx::query("UPDATE core__migrations SET version = 9 WHERE name = '__main__'")
            .execute(db.pool())
            .await
            .unwrap();
        let err = check_db_migrations_current(&db).await.unwrap_err();
        assert!(matches!(err, DbError::Ahead { stored: 9, expected: 3, .. }));
        assert!(matches!(run_migrations(&db).await, Err(DbError::Ahead { .. })));
    }

    #[tokio::test]
    async fn test_new_media_type_needs_update() {
        let db = memory_db(ModelRegistry::new(vec![CORE_MODELS])).await;
        run_migrations(&db).await.unwrap();

        let db = Database::new(db.pool().clone(), ModelRegistry::new(vec![CORE_MODELS, IMAGE_MODELS]));
        let err = check_db_migrations_current(&db).await.unwrap_err();
        assert!(matches!(err, DbError::NotInitialized { set } if set == "image"));

        let applied = run_migrations(&db).await.unwrap();
        assert_eq!(applied, vec![AppliedMigration { set: "image", from: None, to: 2 }]);
        check_db_migrations_current(&db).await.unwrap();
    }
}
