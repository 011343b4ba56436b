//! # Configuration
//!
//! Typed, validated settings for the secret subsystem, loaded from the
//! environment or constructed directly by embedding code.

pub mod database;
pub mod vault;

pub use database::DatabaseConfig;
pub use vault::{
    AwsAuthConfig, KubernetesAuthConfig, KvVersion, VaultAuthMethod, VaultConfig,
    DEFAULT_AWS_MOUNT_PATH, DEFAULT_KUBERNETES_MOUNT_PATH, DEFAULT_KUBERNETES_TOKEN_PATH,
    DEFAULT_STS_ENDPOINT,
};
