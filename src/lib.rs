//! # Vaultline
//!
//! Vaultline is a pluggable secret-management subsystem backed by HashiCorp
//! Vault. Secret metadata lives in a local SQLite store; secret material
//! lives either in a Vault KV engine this library writes to, or behind
//! `path#key` references into a Vault the caller operates.
//!
//! ## Architecture
//!
//! ```text
//! SecretManager trait
//!   ├── VaultSecretManager   (material stored in Vault, rows hold metadata)
//!   └── ByosSecretManager    (rows hold references, resolved on read)
//!            ↓
//!       VaultClient → VaultAuthenticator (token | kubernetes | aws)
//!            ↓
//!       KvAdapter (KV v1/v2 payload and path shapes)
//! ```
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use vaultline::config::{DatabaseConfig, VaultConfig};
//! use vaultline::secrets::{SecretManager, VaultClient, VaultSecretManager};
//! use vaultline::storage::{create_pool, SqlxSecretRepository};
//!
//! # async fn run() -> vaultline::Result<()> {
//! let vault_config = Arc::new(VaultConfig::from_env()?);
//! let pool = create_pool(&DatabaseConfig::from_env()).await?;
//!
//! let client = Arc::new(VaultClient::new(&vault_config)?);
//! let store = Arc::new(SqlxSecretRepository::new(pool));
//! let manager = VaultSecretManager::new(client, store, vault_config);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod errors;
pub mod observability;
pub mod secrets;
pub mod storage;

// Re-export commonly used types and traits
pub use errors::{Result, VaultlineError};

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name from Cargo.toml
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_available() {
        assert!(!VERSION.is_empty());
        assert_eq!(APP_NAME, "vaultline");
    }
}
