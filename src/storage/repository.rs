//! Secret metadata repository.
//!
//! Persists one row per secret. What the `secret` column holds depends on
//! the record's mode: literal values for plain rows, an empty object for
//! Vault-owned rows (the material lives in Vault), and `path#key` reference
//! strings for BYOS rows. The managers own those semantics; this layer just
//! moves rows.

use crate::errors::{Result, VaultlineError};
use crate::secrets::types::SecretMap;
use crate::storage::DbPool;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use tracing::instrument;

/// Database row for secrets.
#[derive(Debug, Clone, FromRow)]
struct SecretRow {
    pub id: String,
    pub name: String,
    pub secret: String,
    pub is_vault: bool,
    pub is_byos_vault: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A secret's metadata row with the stored mapping parsed out of its JSON
/// column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecretRecord {
    pub id: String,
    pub name: String,
    pub secret: SecretMap,
    pub is_vault: bool,
    pub is_byos_vault: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<SecretRow> for SecretRecord {
    type Error = VaultlineError;

    fn try_from(row: SecretRow) -> Result<Self> {
        let secret: SecretMap = serde_json::from_str(&row.secret).map_err(|e| {
            VaultlineError::Serialization {
                source: e,
                context: format!("Secret row '{}' holds invalid JSON", row.id),
            }
        })?;

        Ok(SecretRecord {
            id: row.id,
            name: row.name,
            secret,
            is_vault: row.is_vault,
            is_byos_vault: row.is_byos_vault,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Parameters for creating a secret row.
#[derive(Debug, Clone)]
pub struct CreateSecretRequest {
    pub name: String,
    pub secret: SecretMap,
    pub is_vault: bool,
    pub is_byos_vault: bool,
}

/// Repository trait for secret metadata rows.
#[async_trait]
pub trait SecretRepository: Send + Sync {
    async fn create_secret(&self, request: CreateSecretRequest) -> Result<SecretRecord>;

    async fn get_secret_by_id(&self, id: &str) -> Result<Option<SecretRecord>>;

    /// Replace the stored mapping of an existing row. The row's mode flags
    /// are immutable; only the secret column and `updated_at` change.
    async fn update_secret_value(&self, id: &str, secret: &SecretMap) -> Result<SecretRecord>;

    /// Delete a row, reporting whether it existed.
    async fn delete_secret(&self, id: &str) -> Result<bool>;
}

/// SQLx-based secret repository implementation.
#[derive(Debug, Clone)]
pub struct SqlxSecretRepository {
    pool: DbPool,
}

impl SqlxSecretRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SecretRepository for SqlxSecretRepository {
    #[instrument(
        skip(self, request),
        fields(name = %request.name, is_vault = request.is_vault, is_byos_vault = request.is_byos_vault)
    )]
    async fn create_secret(&self, request: CreateSecretRequest) -> Result<SecretRecord> {
        let id = uuid::Uuid::new_v4().to_string();
        let secret_json = serde_json::to_string(&request.secret).map_err(|e| {
            VaultlineError::Serialization {
                source: e,
                context: "Failed to serialize secret mapping".to_string(),
            }
        })?;
        let now = Utc::now();

        let row = sqlx::query_as::<_, SecretRow>(
            r#"
            INSERT INTO secrets (id, name, secret, is_vault, is_byos_vault, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, name, secret, is_vault, is_byos_vault, created_at, updated_at
            "#,
        )
        .bind(&id)
        .bind(&request.name)
        .bind(&secret_json)
        .bind(request.is_vault)
        .bind(request.is_byos_vault)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| VaultlineError::database(e, "Failed to create secret row"))?;

        row.try_into()
    }

    #[instrument(skip(self), fields(secret_id = %id))]
    async fn get_secret_by_id(&self, id: &str) -> Result<Option<SecretRecord>> {
        let row = sqlx::query_as::<_, SecretRow>(
            r#"
            SELECT id, name, secret, is_vault, is_byos_vault, created_at, updated_at
            FROM secrets
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| VaultlineError::database(e, "Failed to fetch secret row"))?;

        row.map(SecretRecord::try_from).transpose()
    }

    #[instrument(skip(self, secret), fields(secret_id = %id))]
    async fn update_secret_value(&self, id: &str, secret: &SecretMap) -> Result<SecretRecord> {
        let secret_json = serde_json::to_string(secret).map_err(|e| {
            VaultlineError::Serialization {
                source: e,
                context: "Failed to serialize secret mapping".to_string(),
            }
        })?;

        let row = sqlx::query_as::<_, SecretRow>(
            r#"
            UPDATE secrets
            SET secret = $1, updated_at = $2
            WHERE id = $3
            RETURNING id, name, secret, is_vault, is_byos_vault, created_at, updated_at
            "#,
        )
        .bind(&secret_json)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| VaultlineError::database(e, "Failed to update secret row"))?;

        row.ok_or_else(|| VaultlineError::not_found("secret", id))?.try_into()
    }

    #[instrument(skip(self), fields(secret_id = %id))]
    async fn delete_secret(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM secrets WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| VaultlineError::database(e, "Failed to delete secret row"))?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseConfig;
    use crate::storage::{create_pool, run_migrations};
    use serde_json::json;

    async fn repository() -> SqlxSecretRepository {
        let config = DatabaseConfig {
            url: "sqlite://:memory:".to_string(),
            max_connections: 1,
            min_connections: 1,
            auto_migrate: false,
            ..Default::default()
        };
        let pool = create_pool(&config).await.unwrap();
        run_migrations(&pool).await.unwrap();
        SqlxSecretRepository::new(pool)
    }

    fn map(entries: &[(&str, &str)]) -> SecretMap {
        entries.iter().map(|(k, v)| (k.to_string(), json!(v))).collect()
    }

    #[tokio::test]
    async fn test_create_and_get_round_trip() {
        let repo = repository().await;
        let secret = map(&[("API_KEY", "abc"), ("API_SECRET", "def")]);

        let created = repo
            .create_secret(CreateSecretRequest {
                name: "my_service".to_string(),
                secret: secret.clone(),
                is_vault: false,
                is_byos_vault: false,
            })
            .await
            .unwrap();

        assert!(!created.id.is_empty());
        assert_eq!(created.secret, secret);

        let fetched = repo.get_secret_by_id(&created.id).await.unwrap().unwrap();
        assert_eq!(fetched.name, "my_service");
        assert_eq!(fetched.secret, secret);
        assert!(!fetched.is_vault);
        assert!(!fetched.is_byos_vault);
    }

    #[tokio::test]
    async fn test_get_missing_returns_none() {
        let repo = repository().await;
        assert!(repo.get_secret_by_id("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_mode_flags_persist() {
        let repo = repository().await;

        let vault_row = repo
            .create_secret(CreateSecretRequest {
                name: "vault_owned".to_string(),
                secret: SecretMap::new(),
                is_vault: true,
                is_byos_vault: false,
            })
            .await
            .unwrap();
        assert!(vault_row.is_vault);
        assert!(vault_row.secret.is_empty());

        let byos_row = repo
            .create_secret(CreateSecretRequest {
                name: "byos".to_string(),
                secret: map(&[("TOKEN", "kv/data/x#tok")]),
                is_vault: false,
                is_byos_vault: true,
            })
            .await
            .unwrap();
        assert!(byos_row.is_byos_vault);
    }

    #[tokio::test]
    async fn test_update_replaces_mapping_and_keeps_flags() {
        let repo = repository().await;
        let created = repo
            .create_secret(CreateSecretRequest {
                name: "svc".to_string(),
                secret: map(&[("A", "1")]),
                is_vault: true,
                is_byos_vault: false,
            })
            .await
            .unwrap();

        let updated =
            repo.update_secret_value(&created.id, &map(&[("B", "2")])).await.unwrap();
        assert_eq!(updated.secret, map(&[("B", "2")]));
        assert!(updated.is_vault);
        assert_eq!(updated.created_at, created.created_at);
        assert!(updated.updated_at >= created.updated_at);
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let repo = repository().await;
        let err = repo.update_secret_value("ghost", &SecretMap::new()).await.unwrap_err();
        assert!(matches!(err, VaultlineError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_delete_reports_existence() {
        let repo = repository().await;
        let created = repo
            .create_secret(CreateSecretRequest {
                name: "gone".to_string(),
                secret: SecretMap::new(),
                is_vault: false,
                is_byos_vault: false,
            })
            .await
            .unwrap();

        assert!(repo.delete_secret(&created.id).await.unwrap());
        assert!(!repo.delete_secret(&created.id).await.unwrap());
        assert!(repo.get_secret_by_id(&created.id).await.unwrap().is_none());
    }
}
