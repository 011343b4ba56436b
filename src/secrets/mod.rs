//! Secret management subsystem.
//!
//! Two managers share one contract. The Vault-owned manager stores secret
//! material in a Vault KV engine and keeps metadata rows locally; the BYOS
//! manager stores `path#key` references into a Vault the caller operates and
//! resolves them on read. Both sit on top of a thin Vault HTTP client whose
//! authenticator supports static tokens, Kubernetes service-account login,
//! and AWS IAM login, re-authenticating transparently where the method
//! allows it.
//!
//! # Example
//!
//! ```rust,ignore
//! use vaultline::config::VaultConfig;
//! use vaultline::secrets::{SecretManager, VaultClient, VaultSecretManager};
//! use vaultline::storage::SqlxSecretRepository;
//! use std::sync::Arc;
//!
//! let config = Arc::new(VaultConfig::from_env()?);
//! let client = Arc::new(VaultClient::new(&config)?);
//! let store = Arc::new(SqlxSecretRepository::new(pool));
//! let manager = VaultSecretManager::new(client, store, config);
//!
//! let record = manager.create_secret("billing api", &value, false).await?;
//! let fetched = manager.get_secret(&record.id).await?;
//! ```
//!
//! # Security Considerations
//!
//! - Vault tokens are held in [`SecretString`] and never logged
//! - Raw Vault error bodies are logged at the failure site only; callers
//!   receive stable generic messages
//! - Debug output covers paths and mount names, never credentials

pub mod auth;
pub mod byos;
pub mod client;
pub mod kv;
pub mod manager;
pub mod types;
pub mod vault;

// Re-export main types
pub use auth::VaultAuthenticator;
pub use byos::ByosSecretManager;
pub use client::{VaultAuthData, VaultClient, VaultResponse};
pub use kv::KvAdapter;
pub use manager::{ConnectivityReport, ManagerDebugInfo, SecretManager, SecretManagerKind};
pub use types::{SecretMap, SecretString, VaultReference};
pub use vault::VaultSecretManager;
