//! # Vault Configuration
//!
//! Typed configuration for the Vault-backed secret managers: server address,
//! KV engine version, path layout, and the per-method authentication
//! sections. Read-only after construction; `validate()` enforces the
//! cross-field requirements (a role for Kubernetes/AWS auth, a token for
//! static-token auth) that are fatal before any manager is built.

use crate::errors::{Result, VaultlineError};
use crate::secrets::SecretString;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use validator::Validate;

/// Default service-account token path mounted into Kubernetes pods.
pub const DEFAULT_KUBERNETES_TOKEN_PATH: &str =
    "/var/run/secrets/kubernetes.io/serviceaccount/token";

/// Default mount path of Vault's Kubernetes auth backend.
pub const DEFAULT_KUBERNETES_MOUNT_PATH: &str = "kubernetes";

/// Default mount path of Vault's AWS auth backend.
pub const DEFAULT_AWS_MOUNT_PATH: &str = "aws";

/// Global STS endpoint used for the signed GetCallerIdentity request.
pub const DEFAULT_STS_ENDPOINT: &str = "https://sts.amazonaws.com";

/// How the subsystem authenticates to Vault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum VaultAuthMethod {
    /// Static token supplied at construction; never refreshed.
    #[default]
    Token,
    /// Service-account JWT exchanged at Vault's Kubernetes login endpoint.
    Kubernetes,
    /// SigV4-signed GetCallerIdentity exchanged at Vault's AWS login endpoint.
    Aws,
}

impl VaultAuthMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            VaultAuthMethod::Token => "token",
            VaultAuthMethod::Kubernetes => "kubernetes",
            VaultAuthMethod::Aws => "aws",
        }
    }
}

impl fmt::Display for VaultAuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for VaultAuthMethod {
    type Err = VaultlineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "token" => Ok(VaultAuthMethod::Token),
            "kubernetes" => Ok(VaultAuthMethod::Kubernetes),
            "aws" => Ok(VaultAuthMethod::Aws),
            other => Err(VaultlineError::config(format!(
                "Unknown Vault auth method '{}' (expected token, kubernetes, or aws)",
                other
            ))),
        }
    }
}

/// The KV secrets-engine wire format in use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum KvVersion {
    #[serde(rename = "1")]
    V1,
    #[default]
    #[serde(rename = "2")]
    V2,
}

impl KvVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            KvVersion::V1 => "1",
            KvVersion::V2 => "2",
        }
    }

    pub fn is_v2(&self) -> bool {
        matches!(self, KvVersion::V2)
    }
}

impl fmt::Display for KvVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for KvVersion {
    type Err = VaultlineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "1" => Ok(KvVersion::V1),
            "2" => Ok(KvVersion::V2),
            other => Err(VaultlineError::config(format!(
                "Unknown KV version '{}' (expected 1 or 2)",
                other
            ))),
        }
    }
}

/// Kubernetes auth settings. `role` is required; the rest default to the
/// conventions of in-cluster deployments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KubernetesAuthConfig {
    /// Vault role bound to the service account.
    pub role: String,

    /// Mount path of the Kubernetes auth backend.
    pub mount_path: String,

    /// File the service-account JWT is read from at login time.
    pub token_path: String,
}

impl Default for KubernetesAuthConfig {
    fn default() -> Self {
        Self {
            role: String::new(),
            mount_path: DEFAULT_KUBERNETES_MOUNT_PATH.to_string(),
            token_path: DEFAULT_KUBERNETES_TOKEN_PATH.to_string(),
        }
    }
}

/// AWS IAM auth settings. `role` is required.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AwsAuthConfig {
    /// Vault role bound to the IAM principal.
    pub role: String,

    /// Region the SigV4 signature is scoped to.
    pub region: String,

    /// Mount path of the AWS auth backend.
    pub mount_path: String,

    /// STS endpoint named in the signed GetCallerIdentity request.
    pub sts_endpoint: String,

    /// Optional anti-replay value sent (and signed) as
    /// `X-Vault-AWS-IAM-Server-ID`.
    pub server_id_header: Option<String>,
}

impl Default for AwsAuthConfig {
    fn default() -> Self {
        Self {
            role: String::new(),
            region: "us-east-1".to_string(),
            mount_path: DEFAULT_AWS_MOUNT_PATH.to_string(),
            sts_endpoint: DEFAULT_STS_ENDPOINT.to_string(),
            server_id_header: None,
        }
    }
}

/// Process-wide Vault configuration, read-only after construction.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct VaultConfig {
    /// Vault server address, e.g. `http://127.0.0.1:8200`.
    #[validate(length(min = 1, message = "Vault address cannot be empty"))]
    pub address: String,

    /// Selected authentication strategy.
    pub auth_method: VaultAuthMethod,

    /// Static token for [`VaultAuthMethod::Token`]. Redacted in Debug and
    /// serialization.
    pub token: Option<SecretString>,

    /// KV engine wire format.
    pub kv_version: KvVersion,

    /// Base path Vault-owned secrets are written under, e.g.
    /// `secret/data/vaultline` for v2 engines.
    #[validate(length(min = 1, message = "Secret path cannot be empty"))]
    pub secret_path: String,

    /// Optional explicit metadata base path for v2 engines; when unset the
    /// last `/data/` segment of the secret path is rewritten to
    /// `/metadata/`.
    pub secret_metadata_path: Option<String>,

    /// Kubernetes auth section; required when `auth_method` is
    /// [`VaultAuthMethod::Kubernetes`].
    pub kubernetes: Option<KubernetesAuthConfig>,

    /// AWS auth section; required when `auth_method` is
    /// [`VaultAuthMethod::Aws`].
    pub aws: Option<AwsAuthConfig>,

    /// Bound on every Vault HTTP call.
    pub request_timeout_seconds: u64,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            address: "http://127.0.0.1:8200".to_string(),
            auth_method: VaultAuthMethod::Token,
            token: None,
            kv_version: KvVersion::V2,
            secret_path: "secret/data/vaultline".to_string(),
            secret_metadata_path: None,
            kubernetes: None,
            aws: None,
            request_timeout_seconds: 30,
        }
    }
}

impl VaultConfig {
    /// Get the request timeout as a Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    /// Create a VaultConfig from environment variables
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let address = std::env::var("VAULTLINE_VAULT_ADDR")
            .or_else(|_| std::env::var("VAULT_ADDR"))
            .unwrap_or(defaults.address);

        let auth_method = match std::env::var("VAULT_AUTH_METHOD") {
            Ok(value) => value.parse::<VaultAuthMethod>()?,
            Err(_) => VaultAuthMethod::Token,
        };

        let token = std::env::var("VAULT_TOKEN").ok().map(SecretString::new);

        let kv_version = match std::env::var("VAULT_KV_VERSION") {
            Ok(value) => value.parse::<KvVersion>()?,
            Err(_) => KvVersion::V2,
        };

        let secret_path = std::env::var("VAULT_SECRET_PATH").unwrap_or(defaults.secret_path);
        let secret_metadata_path = std::env::var("VAULT_SECRET_METADATA_PATH").ok();

        let kubernetes = std::env::var("VAULT_KUBERNETES_ROLE_NAME").ok().map(|role| {
            KubernetesAuthConfig {
                role,
                mount_path: std::env::var("VAULT_KUBERNETES_MOUNT_PATH")
                    .unwrap_or_else(|_| DEFAULT_KUBERNETES_MOUNT_PATH.to_string()),
                token_path: std::env::var("VAULT_KUBERNETES_TOKEN_PATH")
                    .unwrap_or_else(|_| DEFAULT_KUBERNETES_TOKEN_PATH.to_string()),
            }
        });

        let aws = std::env::var("VAULT_AWS_ROLE_NAME").ok().map(|role| AwsAuthConfig {
            role,
            region: std::env::var("VAULT_AWS_REGION")
                .or_else(|_| std::env::var("AWS_REGION"))
                .unwrap_or_else(|_| AwsAuthConfig::default().region),
            mount_path: std::env::var("VAULT_AWS_MOUNT_PATH")
                .unwrap_or_else(|_| DEFAULT_AWS_MOUNT_PATH.to_string()),
            sts_endpoint: std::env::var("VAULT_AWS_STS_ENDPOINT")
                .unwrap_or_else(|_| DEFAULT_STS_ENDPOINT.to_string()),
            server_id_header: std::env::var("VAULT_AWS_SERVER_ID_HEADER").ok(),
        });

        let request_timeout_seconds = std::env::var("VAULT_TIMEOUT_SECONDS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(defaults.request_timeout_seconds);

        Ok(Self {
            address,
            auth_method,
            token,
            kv_version,
            secret_path,
            secret_metadata_path,
            kubernetes,
            aws,
            request_timeout_seconds,
        })
    }

    /// Validate the configuration, including the per-method requirements
    /// that must fail before any authenticator or manager is constructed.
    pub fn validate(&self) -> Result<()> {
        Validate::validate(self).map_err(VaultlineError::from)?;
        self.validate_custom()
    }

    fn validate_custom(&self) -> Result<()> {
        let address = url::Url::parse(&self.address).map_err(|e| {
            VaultlineError::config(format!("Invalid Vault address '{}': {}", self.address, e))
        })?;
        if address.scheme() != "http" && address.scheme() != "https" {
            return Err(VaultlineError::config(format!(
                "Vault address must use http or https, got '{}'",
                address.scheme()
            )));
        }

        if self.request_timeout_seconds == 0 {
            return Err(VaultlineError::config("Vault request timeout must be at least 1 second"));
        }

        if let Some(metadata_path) = &self.secret_metadata_path {
            if metadata_path.trim().is_empty() {
                return Err(VaultlineError::config("Secret metadata path cannot be blank"));
            }
        }

        match self.auth_method {
            VaultAuthMethod::Token => {
                let has_token = self.token.as_ref().is_some_and(|t| !t.is_empty());
                if !has_token {
                    return Err(VaultlineError::config(
                        "Token auth requires a Vault token at construction",
                    ));
                }
            }
            VaultAuthMethod::Kubernetes => {
                let kubernetes = self.kubernetes.as_ref().ok_or_else(|| {
                    VaultlineError::config("Kubernetes auth requires a role to be configured")
                })?;
                if kubernetes.role.trim().is_empty() {
                    return Err(VaultlineError::config(
                        "Kubernetes auth requires a role to be configured",
                    ));
                }
                if kubernetes.token_path.trim().is_empty() {
                    return Err(VaultlineError::config(
                        "Kubernetes auth requires a service-account token path",
                    ));
                }
            }
            VaultAuthMethod::Aws => {
                let aws = self.aws.as_ref().ok_or_else(|| {
                    VaultlineError::config("AWS auth requires a role to be configured")
                })?;
                if aws.role.trim().is_empty() {
                    return Err(VaultlineError::config(
                        "AWS auth requires a role to be configured",
                    ));
                }
                if aws.region.trim().is_empty() {
                    return Err(VaultlineError::config("AWS auth requires a region"));
                }
                url::Url::parse(&aws.sts_endpoint).map_err(|e| {
                    VaultlineError::config(format!(
                        "Invalid STS endpoint '{}': {}",
                        aws.sts_endpoint, e
                    ))
                })?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token_config() -> VaultConfig {
        VaultConfig { token: Some(SecretString::new("root-token")), ..Default::default() }
    }

    #[test]
    fn test_auth_method_round_trip() {
        for method in [VaultAuthMethod::Token, VaultAuthMethod::Kubernetes, VaultAuthMethod::Aws] {
            assert_eq!(method.as_str().parse::<VaultAuthMethod>().unwrap(), method);
        }
        assert!("ldap".parse::<VaultAuthMethod>().is_err());
    }

    #[test]
    fn test_kv_version_round_trip() {
        assert_eq!("1".parse::<KvVersion>().unwrap(), KvVersion::V1);
        assert_eq!("2".parse::<KvVersion>().unwrap(), KvVersion::V2);
        assert!("3".parse::<KvVersion>().is_err());
        assert!(KvVersion::V2.is_v2());
        assert!(!KvVersion::V1.is_v2());
    }

    #[test]
    fn test_validate_token_config() {
        assert!(token_config().validate().is_ok());

        let missing_token = VaultConfig::default();
        assert!(matches!(
            missing_token.validate().unwrap_err(),
            VaultlineError::Config { .. }
        ));
    }

    #[test]
    fn test_validate_kubernetes_requires_role() {
        let mut config = VaultConfig {
            auth_method: VaultAuthMethod::Kubernetes,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        config.kubernetes = Some(KubernetesAuthConfig::default());
        assert!(config.validate().is_err());

        config.kubernetes =
            Some(KubernetesAuthConfig { role: "vaultline".to_string(), ..Default::default() });
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_aws_requires_role() {
        let mut config = VaultConfig { auth_method: VaultAuthMethod::Aws, ..Default::default() };
        assert!(config.validate().is_err());

        config.aws = Some(AwsAuthConfig { role: "vaultline".to_string(), ..Default::default() });
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_address() {
        let config = VaultConfig { address: "not a url".to_string(), ..token_config() };
        assert!(config.validate().is_err());

        let config = VaultConfig { address: "ftp://vault:8200".to_string(), ..token_config() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_blank_metadata_path() {
        let config =
            VaultConfig { secret_metadata_path: Some("  ".to_string()), ..token_config() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_token_is_redacted_in_serialization() {
        let json = serde_json::to_string(&token_config()).unwrap();
        assert!(json.contains("[REDACTED]"));
        assert!(!json.contains("root-token"));
    }
}
