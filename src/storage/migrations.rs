//! # Database Migration Management
//!
//! Schema evolution for the secret metadata store. Migration SQL is embedded
//! in the binary at compile time and applied transactionally on startup when
//! `auto_migrate` is enabled, with applied versions tracked in a dedicated
//! table so reruns are no-ops.

use crate::errors::{Result, VaultlineError};
use crate::storage::DbPool;
use serde::{Deserialize, Serialize};
use sqlx::Row;
use tracing::{error, info, warn};

/// Embedded migrations, ordered by version.
const MIGRATIONS: &[(i64, &str, &str)] =
    &[(1, "create_secrets", include_str!("../../migrations/0001_create_secrets.sql"))];

/// Migration information structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationInfo {
    pub version: i64,
    pub description: String,
    pub installed_on: chrono::DateTime<chrono::Utc>,
    pub execution_time: i64,
    pub checksum: Vec<u8>,
}

/// Run all pending database migrations
pub async fn run_migrations(pool: &DbPool) -> Result<()> {
    create_migration_table(pool).await?;

    let applied = applied_migration_versions(pool).await?;

    let mut migrations_run = 0;
    for (version, description, sql) in MIGRATIONS {
        if applied.contains(version) {
            continue;
        }

        info!(version = version, "Running migration: {}", description);
        let start_time = std::time::Instant::now();

        let mut tx = pool.begin().await.map_err(|e| {
            VaultlineError::database(e, "Failed to start migration transaction")
        })?;

        // raw_sql supports multi-statement migration files
        sqlx::raw_sql(sql).execute(&mut *tx).await.map_err(|e| {
            error!(error = %e, migration = description, "Migration failed");
            VaultlineError::database(e, format!("Migration failed: {}", description))
        })?;

        let execution_time = start_time.elapsed().as_millis() as i64;
        let checksum = calculate_checksum(sql);

        sqlx::query(
            "INSERT INTO _vaultline_migrations (version, description, checksum, execution_time, installed_on) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(version)
        .bind(description)
        .bind(&checksum)
        .bind(execution_time)
        .bind(chrono::Utc::now())
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            error!(error = %e, migration = description, "Failed to record migration");
            VaultlineError::database(e, format!("Failed to record migration: {}", description))
        })?;

        tx.commit().await.map_err(|e| {
            VaultlineError::database(e, "Failed to commit migration transaction")
        })?;

        migrations_run += 1;
        info!(
            version = version,
            execution_time_ms = execution_time,
            "Migration completed: {}",
            description
        );
    }

    if migrations_run > 0 {
        info!(count = migrations_run, "Database migrations completed");
    } else {
        info!("No pending migrations");
    }

    Ok(())
}

/// Validate that the applied migrations match the embedded set exactly.
pub async fn validate_migrations(pool: &DbPool) -> Result<bool> {
    create_migration_table(pool).await?;
    let applied_versions = applied_migration_versions(pool).await?;
    let expected_versions: Vec<i64> = MIGRATIONS.iter().map(|(version, _, _)| *version).collect();

    for expected in &expected_versions {
        if !applied_versions.contains(expected) {
            warn!(version = expected, "Missing migration");
            return Ok(false);
        }
    }

    for applied in &applied_versions {
        if !expected_versions.contains(applied) {
            warn!(version = applied, "Unexpected migration found");
            return Ok(false);
        }
    }

    Ok(true)
}

/// List all applied migrations.
pub async fn list_applied_migrations(pool: &DbPool) -> Result<Vec<MigrationInfo>> {
    create_migration_table(pool).await?;
    let rows = sqlx::query(
        "SELECT version, description, checksum, execution_time, installed_on \
         FROM _vaultline_migrations ORDER BY version",
    )
    .fetch_all(pool)
    .await
    .map_err(|e| VaultlineError::database(e, "Failed to list applied migrations"))?;

    Ok(rows
        .into_iter()
        .map(|row| MigrationInfo {
            version: row.get("version"),
            description: row.get("description"),
            installed_on: row.get("installed_on"),
            execution_time: row.get("execution_time"),
            checksum: row.get("checksum"),
        })
        .collect())
}

async fn create_migration_table(pool: &DbPool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS _vaultline_migrations (
            version INTEGER PRIMARY KEY,
            description TEXT NOT NULL,
            checksum BLOB NOT NULL,
            execution_time INTEGER NOT NULL,
            installed_on TEXT NOT NULL
        )
    "#,
    )
    .execute(pool)
    .await
    .map_err(|e| VaultlineError::database(e, "Failed to create migration tracking table"))?;

    Ok(())
}

async fn applied_migration_versions(pool: &DbPool) -> Result<Vec<i64>> {
    let rows = sqlx::query("SELECT version FROM _vaultline_migrations ORDER BY version")
        .fetch_all(pool)
        .await
        .map_err(|e| VaultlineError::database(e, "Failed to get applied migrations"))?;

    Ok(rows.into_iter().map(|row| row.get::<i64, _>("version")).collect())
}

fn calculate_checksum(content: &str) -> Vec<u8> {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    content.hash(&mut hasher);
    hasher.finish().to_le_bytes().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseConfig;
    use crate::storage::create_pool;

    // In-memory SQLite gives every pooled connection its own database, so
    // these tests pin the pool to a single connection.
    async fn memory_pool() -> DbPool {
        let config = DatabaseConfig {
            url: "sqlite://:memory:".to_string(),
            max_connections: 1,
            min_connections: 1,
            auto_migrate: false,
            ..Default::default()
        };
        create_pool(&config).await.unwrap()
    }

    #[test]
    fn test_calculate_checksum() {
        let checksum1 = calculate_checksum("CREATE TABLE test (id INTEGER);");
        let checksum2 = calculate_checksum("CREATE TABLE test (id INTEGER);");
        let checksum3 = calculate_checksum("CREATE TABLE other (id INTEGER);");

        assert_eq!(checksum1, checksum2);
        assert_ne!(checksum1, checksum3);
    }

    #[tokio::test]
    async fn test_run_migrations_is_idempotent() {
        let pool = memory_pool().await;

        run_migrations(&pool).await.unwrap();
        run_migrations(&pool).await.unwrap();

        let applied = list_applied_migrations(&pool).await.unwrap();
        assert_eq!(applied.len(), MIGRATIONS.len());
        assert!(validate_migrations(&pool).await.unwrap());
    }

    #[tokio::test]
    async fn test_migrations_create_secrets_table() {
        let pool = memory_pool().await;
        run_migrations(&pool).await.unwrap();

        sqlx::query("SELECT id, name, secret, is_vault, is_byos_vault FROM secrets")
            .fetch_all(&pool)
            .await
            .unwrap();
    }
}
