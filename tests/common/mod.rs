//! Common test utilities for all integration tests.
//!
//! Provides in-memory metadata stores, Vault configurations pointing at a
//! mock server, and manager constructors shared across the test suite.

#![allow(dead_code)]

use std::io::Write;
use std::sync::Arc;

use vaultline::config::{
    DatabaseConfig, KubernetesAuthConfig, KvVersion, VaultAuthMethod, VaultConfig,
};
use vaultline::observability::{init_logging, LoggingConfig};
use vaultline::secrets::{
    ByosSecretManager, SecretMap, SecretString, VaultClient, VaultSecretManager,
};
use vaultline::storage::{create_pool, run_migrations, DbPool, SqlxSecretRepository};

/// Initialise logging once for the whole test binary.
pub fn init_test_logging() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let _ = init_logging(&LoggingConfig::default());
    });
}

/// In-memory metadata store with migrations applied. The pool is pinned to
/// a single connection because every new in-memory SQLite connection would
/// otherwise see its own empty database.
pub async fn memory_store() -> (DbPool, Arc<SqlxSecretRepository>) {
    let config = DatabaseConfig {
        url: "sqlite://:memory:".to_string(),
        max_connections: 1,
        min_connections: 1,
        auto_migrate: false,
        ..Default::default()
    };
    let pool = create_pool(&config).await.expect("create in-memory pool");
    run_migrations(&pool).await.expect("run migrations");
    let repository = Arc::new(SqlxSecretRepository::new(pool.clone()));
    (pool, repository)
}

/// Token-auth configuration pointing at a mock Vault server, KV v2 with
/// secrets under `secret/data/app`.
pub fn vault_config_v2(address: &str) -> VaultConfig {
    VaultConfig {
        address: address.to_string(),
        token: Some(SecretString::new("test-root-token")),
        kv_version: KvVersion::V2,
        secret_path: "secret/data/app".to_string(),
        ..Default::default()
    }
}

/// Like [`vault_config_v2`] but for a KV v1 mount under `secret/app`.
pub fn vault_config_v1(address: &str) -> VaultConfig {
    VaultConfig {
        kv_version: KvVersion::V1,
        secret_path: "secret/app".to_string(),
        ..vault_config_v2(address)
    }
}

/// Kubernetes-auth configuration whose service-account JWT is read from
/// `token_path`.
pub fn vault_config_kubernetes(address: &str, token_path: &str) -> VaultConfig {
    VaultConfig {
        address: address.to_string(),
        auth_method: VaultAuthMethod::Kubernetes,
        token: None,
        kv_version: KvVersion::V2,
        secret_path: "secret/data/app".to_string(),
        kubernetes: Some(KubernetesAuthConfig {
            role: "vaultline".to_string(),
            token_path: token_path.to_string(),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Build a Vault-owned manager over a fresh in-memory store.
pub async fn vault_manager(
    config: VaultConfig,
) -> (VaultSecretManager, DbPool, Arc<SqlxSecretRepository>) {
    init_test_logging();
    let (pool, repository) = memory_store().await;
    let config = Arc::new(config);
    let client = Arc::new(VaultClient::new(&config).expect("build vault client"));
    let manager = VaultSecretManager::new(client, repository.clone(), config);
    (manager, pool, repository)
}

/// Build a BYOS manager over a fresh in-memory store.
pub async fn byos_manager(
    config: VaultConfig,
) -> (ByosSecretManager, DbPool, Arc<SqlxSecretRepository>) {
    init_test_logging();
    let (pool, repository) = memory_store().await;
    let config = Arc::new(config);
    let client = Arc::new(VaultClient::new(&config).expect("build vault client"));
    let manager = ByosSecretManager::new(client, repository.clone(), config);
    (manager, pool, repository)
}

/// Write a service-account JWT to a temp file, returning the guard that
/// keeps the file alive.
pub fn write_jwt_file(jwt: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("create jwt temp file");
    writeln!(file, "{}", jwt).expect("write jwt");
    file.flush().expect("flush jwt");
    file
}

/// Shorthand for building a `SecretMap` from string pairs.
pub fn secret_map(entries: &[(&str, &str)]) -> SecretMap {
    entries.iter().map(|(k, v)| (k.to_string(), serde_json::json!(v))).collect()
}

/// Count rows in the secrets table directly, bypassing the repository.
pub async fn count_secret_rows(pool: &DbPool) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM secrets")
        .fetch_one(pool)
        .await
        .expect("count secret rows")
}
