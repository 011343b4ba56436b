//! # Storage and Persistence
//!
//! This module provides database connectivity and the persistence layer for
//! secret metadata rows.

pub mod migrations;
pub mod pool;
pub mod repository;

pub use crate::config::DatabaseConfig;

pub use migrations::{list_applied_migrations, run_migrations, validate_migrations, MigrationInfo};
pub use pool::{create_pool, DbPool};
pub use repository::{CreateSecretRequest, SecretRecord, SecretRepository, SqlxSecretRepository};

use crate::errors::{Result, VaultlineError};

/// Check database connectivity
pub async fn check_connection(pool: &DbPool) -> Result<()> {
    sqlx::query("SELECT 1").fetch_one(pool).await.map_err(|e| VaultlineError::Database {
        source: e,
        context: "Database connectivity check failed".to_string(),
    })?;

    Ok(())
}
