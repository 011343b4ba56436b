//! Bring-your-own-secrets manager.
//!
//! Rows hold `path#key` references into a Vault tree the caller owns and
//! populates. Reads resolve those references; everything else is metadata
//! bookkeeping. This manager never writes to or deletes from Vault.

use crate::config::VaultConfig;
use crate::errors::{Result, VaultlineError};
use crate::secrets::client::VaultClient;
use crate::secrets::kv::KvAdapter;
use crate::secrets::manager::{
    operational_error, ConnectivityReport, ManagerDebugInfo, SecretManager, SecretManagerKind,
};
use crate::secrets::types::{SecretMap, VaultReference};
use crate::storage::{CreateSecretRequest, SecretRecord, SecretRepository};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Secret manager for references into a caller-operated Vault.
pub struct ByosSecretManager {
    client: Arc<VaultClient>,
    store: Arc<dyn SecretRepository>,
    kv: KvAdapter,
    config: Arc<VaultConfig>,
}

impl ByosSecretManager {
    pub fn new(
        client: Arc<VaultClient>,
        store: Arc<dyn SecretRepository>,
        config: Arc<VaultConfig>,
    ) -> Self {
        let kv = KvAdapter::from_config(&config);
        Self { client, store, kv, config }
    }

    /// Resolve every `path#key` reference in the row, reading each distinct
    /// Vault path once. A reference whose key is absent from the Vault data
    /// is logged and omitted; a malformed reference fails the whole read.
    async fn resolve_references(&self, row: &SecretRecord) -> Result<SecretMap> {
        let mut by_path: BTreeMap<String, Vec<(String, String)>> = BTreeMap::new();
        for (field, value) in &row.secret {
            let raw = value.as_str().ok_or_else(|| {
                VaultlineError::reference(
                    value.to_string(),
                    format!("field '{}' must be a 'path#key' string", field),
                )
            })?;
            let reference = VaultReference::parse(raw)?;
            by_path.entry(reference.path).or_default().push((field.clone(), reference.key));
        }

        let mut resolved = SecretMap::new();
        for (path, fields) in by_path {
            let response = self
                .client
                .read(&path)
                .await
                .map_err(|err| operational_error("read", &path, self.kv.version(), err))?;
            let data = response.data.as_ref().ok_or_else(|| {
                operational_error(
                    "read",
                    &path,
                    self.kv.version(),
                    VaultlineError::vault_operation(None, "read", "Vault response carried no data"),
                )
            })?;
            let map = self
                .kv
                .extract_data_map(data)
                .map_err(|err| operational_error("read", &path, self.kv.version(), err))?;

            for (field, key) in fields {
                match map.get(&key) {
                    Some(value) => {
                        resolved.insert(field, value.clone());
                    }
                    None => {
                        warn!(
                            path = %path,
                            key = %key,
                            field = %field,
                            "Referenced key missing in Vault; omitting field"
                        );
                    }
                }
            }
        }

        Ok(resolved)
    }
}

#[async_trait]
impl SecretManager for ByosSecretManager {
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

        // References are stored verbatim; resolution happens on read.
        self.store
            .create_secret(CreateSecretRequest {
                name: name.to_string(),
                secret: value.clone(),
                is_vault: false,
                is_byos_vault: true,
            })
            .await
    }

    #[instrument(skip(self), fields(secret_id = %id))]
    async fn get_secret(&self, id: &str) -> Result<Option<SecretRecord>> {
        let Some(row) = self.store.get_secret_by_id(id).await? else {
            return Ok(None);
        };

        if !row.is_byos_vault || row.secret.is_empty() {
            return Ok(Some(row));
        }

        let secret = self.resolve_references(&row).await?;
        Ok(Some(SecretRecord { secret, ..row }))
    }

    #[instrument(skip(self, value), fields(secret_id = %id))]
    async fn update_secret(
        &self,
        id: &str,
        value: &SecretMap,
    ) -> Result<Option<SecretRecord>> {
        if self.store.get_secret_by_id(id).await?.is_none() {
            return Ok(None);
        }

        let updated = self.store.update_secret_value(id, value).await?;
        Ok(Some(updated))
    }

    #[instrument(skip(self), fields(secret_id = %id))]
    async fn delete_secret(&self, id: &str) -> Result<bool> {
        // The referenced Vault data belongs to the caller; only the row goes.
        self.store.delete_secret(id).await
    }

    async fn check_connectivity(&self) -> Result<ConnectivityReport> {
        Err(VaultlineError::validation(
            "BYOS connectivity checks require per-folder context; probe a specific secret instead",
        ))
    }

    fn debug_info(&self) -> ManagerDebugInfo {
        let kubernetes = self.config.kubernetes.as_ref();
        ManagerDebugInfo {
            manager_type: SecretManagerKind::ByosVault,
            kv_version: Some(self.config.kv_version),
            auth_method: Some(self.config.auth_method),
            secret_path: None,
            metadata_path: None,
            kubernetes_mount: kubernetes.map(|k| k.mount_path.clone()),
            kubernetes_token_path: kubernetes.map(|k| k.token_path.clone()),
        }
    }

    fn kind(&self) -> SecretManagerKind {
        SecretManagerKind::ByosVault
    }
}
