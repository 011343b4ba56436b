//! Vault-owned secret manager.
//!
//! Secret material lives in Vault's KV engine; the metadata store keeps one
//! row per secret whose `secret` column stays an empty object. The KV path
//! is rebuilt from the row's stored name and id, so names are sanitized into
//! safe path segments before the row is written. Rows created with
//! `force_db` skip Vault entirely and keep their value in the row.

use crate::config::VaultConfig;
use crate::errors::{Result, VaultlineError};
use crate::secrets::client::VaultClient;
use crate::secrets::kv::KvAdapter;
use crate::secrets::manager::{
    operational_error, ConnectivityReport, ManagerDebugInfo, SecretManager, SecretManagerKind,
};
use crate::secrets::types::SecretMap;
use crate::storage::{CreateSecretRequest, SecretRecord, SecretRepository};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, error, info, instrument};

const MAX_SECRET_NAME_LEN: usize = 64;
const FALLBACK_SECRET_NAME: &str = "secret";

/// Reduce an arbitrary display name to a Vault path segment.
///
/// Output always matches `[A-Za-z_][A-Za-z0-9_]*` and is at most 64
/// characters: disallowed characters become underscores, a leading digit
/// gains an underscore prefix, and blank input falls back to `"secret"`.
pub(crate) fn sanitize_name(name: &str) -> String {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return FALLBACK_SECRET_NAME.to_string();
    }

    let mut sanitized: String = trimmed
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();

    if sanitized.as_bytes().first().is_some_and(|b| b.is_ascii_digit()) {
        sanitized.insert(0, '_');
    }

    sanitized.truncate(MAX_SECRET_NAME_LEN);
    sanitized
}

/// Secret manager that writes secret material to Vault.
pub struct VaultSecretManager {
    client: Arc<VaultClient>,
    store: Arc<dyn SecretRepository>,
    kv: KvAdapter,
    config: Arc<VaultConfig>,
}

impl VaultSecretManager {
    pub fn new(
        client: Arc<VaultClient>,
        store: Arc<dyn SecretRepository>,
        config: Arc<VaultConfig>,
    ) -> Self {
        let kv = KvAdapter::from_config(&config);
        Self { client, store, kv, config }
    }

    async fn read_vault_value(&self, path: &str) -> Result<SecretMap> {
        let response = self.client.read(path).await?;
        let data = response.data.as_ref().ok_or_else(|| {
            VaultlineError::vault_operation(None, "read", "Vault response carried no data")
        })?;
        let raw = self.kv.extract_secret_value(data)?;

        serde_json::from_str(raw).map_err(|e| VaultlineError::Serialization {
            source: e,
            context: format!("Secret at '{}' is not a JSON object", path),
        })
    }
}

#[async_trait]
impl SecretManager for VaultSecretManager {
    #[instrument(skip(self, value), fields(name = %name, force_db))]
    async fn create_secret(
        &self,
        name: &str,
        value: &SecretMap,
        force_db: bool,
    ) -> Result<SecretRecord> {
        if force_db {
            debug!(name = %name, "Storing secret value directly in the metadata store");
            return self
                .store
                .create_secret(CreateSecretRequest {
                    name: name.to_string(),
                    secret: value.clone(),
                    is_vault: false,
                    is_byos_vault: false,
                })
                .await;
        }

        let serialized = serde_json::to_string(value).map_err(|e| {
            VaultlineError::Serialization {
                source: e,
                context: "Failed to serialize secret value".to_string(),
            }
        })?;

        // The row goes in first so the Vault path can carry the generated id.
        let row = self
            .store
            .create_secret(CreateSecretRequest {
                name: sanitize_name(name),
                secret: SecretMap::new(),
                is_vault: true,
                is_byos_vault: false,
            })
            .await?;

        let path = self.kv.secret_path(&row.name, &row.id);
        let payload = self.kv.build_write_payload(&serialized);

        if let Err(err) = self.client.write(&path, &payload).await {
            // No orphan rows: a secret we could not store must not stay listed.
            if let Err(cleanup_err) = self.store.delete_secret(&row.id).await {
                error!(
                    secret_id = %row.id,
                    error = %cleanup_err,
                    "Failed to remove metadata row after Vault write failure"
                );
            }
            return Err(operational_error("write", &path, self.kv.version(), err));
        }

        info!(secret_id = %row.id, path = %path, "Stored secret in Vault");

        Ok(SecretRecord { secret: value.clone(), ..row })
    }

    #[instrument(skip(self), fields(secret_id = %id))]
    async fn get_secret(&self, id: &str) -> Result<Option<SecretRecord>> {
        let Some(row) = self.store.get_secret_by_id(id).await? else {
            return Ok(None);
        };

        if !row.is_vault {
            return Ok(Some(row));
        }

        let path = self.kv.secret_path(&row.name, &row.id);
        let secret = self
            .read_vault_value(&path)
            .await
            .map_err(|err| operational_error("read", &path, self.kv.version(), err))?;

        Ok(Some(SecretRecord { secret, ..row }))
    }

    #[instrument(skip(self, value), fields(secret_id = %id))]
    async fn update_secret(
        &self,
        id: &str,
        value: &SecretMap,
    ) -> Result<Option<SecretRecord>> {
        let Some(row) = self.store.get_secret_by_id(id).await? else {
            return Ok(None);
        };

        if !row.is_vault {
            let updated = self.store.update_secret_value(id, value).await?;
            return Ok(Some(updated));
        }

        let serialized = serde_json::to_string(value).map_err(|e| {
            VaultlineError::Serialization {
                source: e,
                context: "Failed to serialize secret value".to_string(),
            }
        })?;

        let path = self.kv.secret_path(&row.name, &row.id);
        let payload = self.kv.build_write_payload(&serialized);

        self.client
            .write(&path, &payload)
            .await
            .map_err(|err| operational_error("write", &path, self.kv.version(), err))?;

        // Vault already holds the new value; the row keeps an empty map.
        let updated = self.store.update_secret_value(id, &SecretMap::new()).await?;
        info!(secret_id = %id, path = %path, "Updated secret in Vault");

        Ok(Some(SecretRecord { secret: value.clone(), ..updated }))
    }

    #[instrument(skip(self), fields(secret_id = %id))]
    async fn delete_secret(&self, id: &str) -> Result<bool> {
        let Some(row) = self.store.get_secret_by_id(id).await? else {
            return Ok(false);
        };

        if row.is_vault {
            // Vault first: if the material cannot be removed the row must
            // survive, otherwise the secret would become unreachable.
            let path = self.kv.metadata_path(&row.name, &row.id);
            self.client
                .delete(&path)
                .await
                .map_err(|err| operational_error("delete", &path, self.kv.version(), err))?;
            info!(secret_id = %id, path = %path, "Deleted secret material from Vault");
        }

        self.store.delete_secret(id).await
    }

    #[instrument(skip(self))]
    async fn check_connectivity(&self) -> Result<ConnectivityReport> {
        let base = self.kv.list_base_path();
        match self.client.list(&base).await {
            Ok(keys) => Ok(ConnectivityReport { secret_count: keys.len() }),
            Err(VaultlineError::VaultOperation { status: Some(404), .. }) => {
                debug!(path = %base, "List path does not exist yet; reporting zero secrets");
                Ok(ConnectivityReport { secret_count: 0 })
            }
            Err(err) => Err(operational_error("list", &base, self.kv.version(), err)),
        }
    }

    fn debug_info(&self) -> ManagerDebugInfo {
        let kubernetes = self.config.kubernetes.as_ref();
        ManagerDebugInfo {
            manager_type: SecretManagerKind::Vault,
            kv_version: Some(self.config.kv_version),
            auth_method: Some(self.config.auth_method),
            secret_path: Some(self.config.secret_path.clone()),
            metadata_path: self.config.kv_version.is_v2().then(|| self.kv.list_base_path()),
            kubernetes_mount: kubernetes.map(|k| k.mount_path.clone()),
            kubernetes_token_path: kubernetes.map(|k| k.token_path.clone()),
        }
    }

    fn kind(&self) -> SecretManagerKind {
        SecretManagerKind::Vault
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_sanitize_name_replaces_disallowed_characters() {
        assert_eq!(sanitize_name("My Service!!"), "My_Service__");
        assert_eq!(sanitize_name("db.primary/eu-west"), "db_primary_eu_west");
        assert_eq!(sanitize_name("café"), "caf_");
    }

    #[test]
    fn test_sanitize_name_keeps_valid_names() {
        assert_eq!(sanitize_name("billing_api"), "billing_api");
        assert_eq!(sanitize_name("_internal"), "_internal");
        assert_eq!(sanitize_name("Svc42"), "Svc42");
    }

    #[test]
    fn test_sanitize_name_prefixes_leading_digit() {
        assert_eq!(sanitize_name("9lives"), "_9lives");
        assert_eq!(sanitize_name("42"), "_42");
    }

    #[test]
    fn test_sanitize_name_blank_falls_back() {
        assert_eq!(sanitize_name(""), "secret");
        assert_eq!(sanitize_name("   "), "secret");
        assert_eq!(sanitize_name("\t\n"), "secret");
    }

    #[test]
    fn test_sanitize_name_truncates_long_names() {
        let long = "a".repeat(200);
        assert_eq!(sanitize_name(&long).len(), MAX_SECRET_NAME_LEN);

        let digit_led = format!("7{}", "b".repeat(100));
        let sanitized = sanitize_name(&digit_led);
        assert_eq!(sanitized.len(), MAX_SECRET_NAME_LEN);
        assert!(sanitized.starts_with("_7"));
    }

    proptest! {
        #[test]
        fn sanitized_names_are_valid_path_segments(input in "\\PC*") {
            let out = sanitize_name(&input);
            prop_assert!(!out.is_empty());
            prop_assert!(out.len() <= MAX_SECRET_NAME_LEN);
            let first = out.chars().next().unwrap();
            prop_assert!(first.is_ascii_alphabetic() || first == '_');
            prop_assert!(out.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'));
        }
    }
}
