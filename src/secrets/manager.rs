//! Secret manager contract
//!
//! Defines the interface every secret manager implements, plus the small
//! report types managers hand back for connectivity probes and debug
//! inspection. The Vault-owned and BYOS managers live in sibling modules.

use crate::config::{KvVersion, VaultAuthMethod};
use crate::errors::{Result, VaultlineError};
use crate::secrets::types::SecretMap;
use crate::storage::SecretRecord;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Type of secret manager
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecretManagerKind {
    /// Vault stores the secret material; rows carry only metadata.
    Vault,
    /// Bring-your-own-secrets: rows carry `path#key` references into a
    /// Vault the caller operates.
    ByosVault,
}

impl SecretManagerKind {
    /// Get the wire representation of this kind
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vault => "vault",
            Self::ByosVault => "byos_vault",
        }
    }
}

impl FromStr for SecretManagerKind {
    type Err = VaultlineError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "vault" => Ok(Self::Vault),
            "byos_vault" => Ok(Self::ByosVault),
            other => {
                Err(VaultlineError::config(format!("Unknown secret manager kind: {}", other)))
            }
        }
    }
}

impl fmt::Display for SecretManagerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of a connectivity probe against the backing store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectivityReport {
    /// Number of secrets visible under the manager's base path.
    pub secret_count: usize,
}

/// Non-sensitive description of a manager's configuration.
///
/// Safe to expose on diagnostic endpoints: paths and mount names only,
/// never tokens or secret material.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ManagerDebugInfo {
    pub manager_type: SecretManagerKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kv_version: Option<KvVersion>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_method: Option<VaultAuthMethod>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kubernetes_mount: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kubernetes_token_path: Option<String>,
}

/// Trait for secret managers
///
/// Implementations must be Send + Sync for use in async contexts. Absent
/// records surface as `Ok(None)` or `Ok(false)`, never as errors.
#[async_trait]
pub trait SecretManager: Send + Sync {
    /// Create a secret. With `force_db` the value is stored verbatim in the
    /// metadata row and the external backend is never touched.
    async fn create_secret(
        &self,
        name: &str,
        value: &SecretMap,
        force_db: bool,
    ) -> Result<SecretRecord>;

    /// Fetch a secret with its material resolved from wherever it lives.
    async fn get_secret(&self, id: &str) -> Result<Option<SecretRecord>>;

    /// Replace a secret's value, returning the refreshed record.
    async fn update_secret(&self, id: &str, value: &SecretMap)
        -> Result<Option<SecretRecord>>;

    /// Delete a secret, reporting whether it existed.
    async fn delete_secret(&self, id: &str) -> Result<bool>;

    /// Alias for [`delete_secret`](Self::delete_secret).
    async fn remove_secret(&self, id: &str) -> Result<bool> {
        self.delete_secret(id).await
    }

    /// Probe the backing store and count the secrets visible to it.
    async fn check_connectivity(&self) -> Result<ConnectivityReport>;

    /// Describe the manager's configuration without secret material.
    fn debug_info(&self) -> ManagerDebugInfo;

    /// Get the manager kind identifier
    fn kind(&self) -> SecretManagerKind;
}

/// Convert a transport-level failure into the error managers surface.
///
/// Raw Vault error text is logged here with the operation context and then
/// replaced with a stable message, so callers never see backend internals.
/// Errors that are already caller-safe pass through untouched.
pub(crate) fn operational_error(
    operation: &str,
    path: &str,
    kv_version: KvVersion,
    err: VaultlineError,
) -> VaultlineError {
    match err {
        VaultlineError::VaultOperation { status, message, .. } => {
            tracing::error!(
                operation,
                path,
                kv_version = %kv_version,
                status = ?status,
                error = %message,
                "Vault request failed"
            );
            VaultlineError::vault_operation(
                status,
                operation,
                "The Vault request failed; try again or contact an administrator",
            )
        }
        VaultlineError::Timeout { duration_ms, .. } => {
            tracing::error!(
                operation,
                path,
                kv_version = %kv_version,
                duration_ms,
                "Vault request timed out"
            );
            VaultlineError::vault_operation(
                None,
                operation,
                "Vault did not respond in time; try again or contact an administrator",
            )
        }
        VaultlineError::Http { message } => {
            tracing::error!(
                operation,
                path,
                kv_version = %kv_version,
                error = %message,
                "Vault request could not be sent"
            );
            VaultlineError::vault_operation(
                None,
                operation,
                "Vault is unreachable; try again or contact an administrator",
            )
        }
        other => other,
    }
}
