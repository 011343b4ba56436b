//! Vault authentication strategies.
//!
//! Three login methods are supported. Static token auth uses a token handed
//! over at construction and never refreshes it. Kubernetes auth exchanges
//! the pod's service-account JWT at Vault's Kubernetes login endpoint and
//! may repeat that exchange when a token stops working. AWS IAM auth signs
//! an STS `GetCallerIdentity` request with SigV4 and presents the signed
//! material to Vault's AWS login endpoint.
//!
//! Initialization is lazy and idempotent. The cached session token sits
//! behind a mutex that stays held for the whole login exchange, so
//! concurrent first requests line up behind a single login instead of
//! stampeding Vault.
//!
//! Raw login failure details from Vault go to the error log only; callers
//! always receive the same generic authentication error.

use std::time::SystemTime;

use aws_config::{BehaviorVersion, Region};
use aws_credential_types::provider::ProvideCredentials;
use aws_sigv4::http_request::{sign, SignableBody, SignableRequest, SigningParams, SigningSettings};
use aws_sigv4::sign::v4;
use aws_smithy_runtime_api::client::identity::Identity;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde_json::json;
use tokio::sync::Mutex;

use crate::config::{VaultAuthMethod, VaultConfig};
use crate::errors::{Result, VaultlineError};

use super::client::{parse_error_detail, VaultResponse};
use super::types::SecretString;

/// Message returned to callers for every login failure. The raw Vault
/// error is logged, never surfaced.
const LOGIN_FAILURE_MESSAGE: &str = "Vault authentication failed";

/// Body of the STS request Vault replays to verify the caller's identity.
const STS_REQUEST_BODY: &str = "Action=GetCallerIdentity&Version=2011-06-15";

#[derive(Debug)]
enum AuthStrategy {
    Token {
        token: SecretString,
    },
    Kubernetes {
        role: String,
        mount_path: String,
        token_path: String,
    },
    AwsIam {
        role: String,
        region: String,
        mount_path: String,
        sts_endpoint: String,
        server_id_header: Option<String>,
    },
}

/// Handles login and session-token caching for a Vault server.
#[derive(Debug)]
pub struct VaultAuthenticator {
    strategy: AuthStrategy,
    http: reqwest::Client,
    address: String,
    cached_token: Mutex<Option<SecretString>>,
}

impl VaultAuthenticator {
    /// Build an authenticator for the configured method.
    ///
    /// Fails with a configuration error when the selected method is missing
    /// its required material: a token for static-token auth, a role for
    /// Kubernetes or AWS auth.
    pub fn new(config: &VaultConfig, http: reqwest::Client) -> Result<Self> {
        let strategy = match config.auth_method {
            VaultAuthMethod::Token => {
                let token = config.token.clone().filter(|t| !t.is_empty()).ok_or_else(|| {
                    VaultlineError::config("Token auth requires a Vault token at construction")
                })?;
                AuthStrategy::Token { token }
            }
            VaultAuthMethod::Kubernetes => {
                let kubernetes = config
                    .kubernetes
                    .as_ref()
                    .filter(|k| !k.role.trim().is_empty())
                    .ok_or_else(|| {
                        VaultlineError::config(
                            "Kubernetes auth requires a role to be configured",
                        )
                    })?;
                AuthStrategy::Kubernetes {
                    role: kubernetes.role.clone(),
                    mount_path: kubernetes.mount_path.clone(),
                    token_path: kubernetes.token_path.clone(),
                }
            }
            VaultAuthMethod::Aws => {
                let aws =
                    config.aws.as_ref().filter(|a| !a.role.trim().is_empty()).ok_or_else(
                        || VaultlineError::config("AWS auth requires a role to be configured"),
                    )?;
                AuthStrategy::AwsIam {
                    role: aws.role.clone(),
                    region: aws.region.clone(),
                    mount_path: aws.mount_path.clone(),
                    sts_endpoint: aws.sts_endpoint.clone(),
                    server_id_header: aws.server_id_header.clone(),
                }
            }
        };

        Ok(Self {
            strategy,
            http,
            address: config.address.trim_end_matches('/').to_string(),
            cached_token: Mutex::new(None),
        })
    }

    /// The configured authentication method.
    pub fn auth_method(&self) -> VaultAuthMethod {
        match self.strategy {
            AuthStrategy::Token { .. } => VaultAuthMethod::Token,
            AuthStrategy::Kubernetes { .. } => VaultAuthMethod::Kubernetes,
            AuthStrategy::AwsIam { .. } => VaultAuthMethod::Aws,
        }
    }

    /// Whether an expired session can be repaired by logging in again.
    ///
    /// Only the Kubernetes flow re-authenticates; static tokens have
    /// nothing to refresh with, and AWS sessions are treated the same way.
    pub fn supports_reauth(&self) -> bool {
        matches!(self.strategy, AuthStrategy::Kubernetes { .. })
    }

    /// Log in if no session token is cached. Safe to call repeatedly and
    /// concurrently; at most one login runs at a time.
    pub async fn ensure_initialized(&self) -> Result<()> {
        self.bearer_token().await.map(|_| ())
    }

    /// The token to present on Vault requests, logging in first if needed.
    ///
    /// The cache lock is held across the whole login exchange, so callers
    /// racing an expired session wait for one login rather than each
    /// starting their own.
    pub async fn bearer_token(&self) -> Result<SecretString> {
        if let AuthStrategy::Token { token } = &self.strategy {
            return Ok(token.clone());
        }

        let mut cached = self.cached_token.lock().await;
        if let Some(token) = cached.as_ref() {
            return Ok(token.clone());
        }

        let token = self.login().await?;
        *cached = Some(token.clone());
        Ok(token)
    }

    /// Drop the cached session token so the next request logs in again.
    /// No-op for static token auth.
    pub async fn invalidate(&self) {
        if matches!(self.strategy, AuthStrategy::Token { .. }) {
            return;
        }
        let mut cached = self.cached_token.lock().await;
        *cached = None;
    }

    async fn login(&self) -> Result<SecretString> {
        match &self.strategy {
            AuthStrategy::Token { token } => Ok(token.clone()),
            AuthStrategy::Kubernetes { role, mount_path, token_path } => {
                self.login_kubernetes(role, mount_path, token_path).await
            }
            AuthStrategy::AwsIam { role, region, mount_path, sts_endpoint, server_id_header } => {
                self.login_aws(role, region, mount_path, sts_endpoint, server_id_header.as_deref())
                    .await
            }
        }
    }

    async fn login_kubernetes(
        &self,
        role: &str,
        mount_path: &str,
        token_path: &str,
    ) -> Result<SecretString> {
        let jwt = tokio::fs::read_to_string(token_path).await.map_err(|e| {
            tracing::error!(
                error = %e,
                token_path = %token_path,
                "Failed to read service-account token for Vault login"
            );
            VaultlineError::auth(LOGIN_FAILURE_MESSAGE)
        })?;

        let payload = json!({ "role": role, "jwt": jwt.trim() });
        self.submit_login(&format!("auth/{}/login", mount_path), &payload).await
    }

    async fn login_aws(
        &self,
        role: &str,
        region: &str,
        mount_path: &str,
        sts_endpoint: &str,
        server_id_header: Option<&str>,
    ) -> Result<SecretString> {
        let payload = self
            .build_aws_login_payload(role, region, sts_endpoint, server_id_header)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, region = %region, "Failed to build signed AWS login request");
                VaultlineError::auth(LOGIN_FAILURE_MESSAGE)
            })?;

        self.submit_login(&format!("auth/{}/login", mount_path), &payload).await
    }

    /// Sign an STS GetCallerIdentity request with the ambient AWS
    /// credentials and bundle it the way Vault's AWS auth backend expects:
    /// method, URL, body, and headers, each base64-encoded.
    async fn build_aws_login_payload(
        &self,
        role: &str,
        region: &str,
        sts_endpoint: &str,
        server_id_header: Option<&str>,
    ) -> Result<serde_json::Value> {
        let shared_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .load()
            .await;
        let provider = shared_config.credentials_provider().ok_or_else(|| {
            VaultlineError::auth("No AWS credentials provider available")
        })?;
        let credentials = provider
            .provide_credentials()
            .await
            .map_err(|e| VaultlineError::auth(format!("AWS credentials unavailable: {}", e)))?;
        let identity: Identity = credentials.into();

        let endpoint = url::Url::parse(sts_endpoint).map_err(|e| {
            VaultlineError::config(format!("Invalid STS endpoint '{}': {}", sts_endpoint, e))
        })?;
        let host = endpoint
            .host_str()
            .ok_or_else(|| {
                VaultlineError::config(format!("STS endpoint '{}' has no host", sts_endpoint))
            })?
            .to_string();

        let mut headers: Vec<(String, String)> = vec![
            ("content-type".to_string(), "application/x-www-form-urlencoded; charset=utf-8".to_string()),
            ("host".to_string(), host),
        ];
        if let Some(server_id) = server_id_header {
            headers.push(("x-vault-aws-iam-server-id".to_string(), server_id.to_string()));
        }

        let params: v4::SigningParams<'_, SigningSettings> = v4::SigningParams::builder()
            .identity(&identity)
            .region(region)
            .name("sts")
            .time(SystemTime::now())
            .settings(SigningSettings::default())
            .build()
            .map_err(|e| VaultlineError::auth(format!("Failed to build signing parameters: {}", e)))?;
        let params: SigningParams<'_> = params.into();

        let signable = SignableRequest::new(
            "POST",
            sts_endpoint,
            headers.iter().map(|(name, value)| (name.as_str(), value.as_str())),
            SignableBody::Bytes(STS_REQUEST_BODY.as_bytes()),
        )
        .map_err(|e| VaultlineError::auth(format!("Failed to assemble signable request: {}", e)))?;

        let (signing_instructions, _signature) = sign(signable, &params)
            .map_err(|e| VaultlineError::auth(format!("SigV4 signing failed: {}", e)))?
            .into_parts();

        let mut signed_headers = serde_json::Map::new();
        for (name, value) in &headers {
            signed_headers.insert(name.clone(), json!(value));
        }
        for (name, value) in signing_instructions.headers() {
            signed_headers.insert(name.to_string(), json!(value));
        }

        Ok(json!({
            "role": role,
            "iam_http_request_method": "POST",
            "iam_request_url": BASE64.encode(sts_endpoint.as_bytes()),
            "iam_request_body": BASE64.encode(STS_REQUEST_BODY.as_bytes()),
            "iam_request_headers": BASE64.encode(serde_json::to_string(&signed_headers)?.as_bytes()),
        }))
    }

    async fn submit_login(
        &self,
        login_path: &str,
        payload: &serde_json::Value,
    ) -> Result<SecretString> {
        let url = format!("{}/v1/{}", self.address, login_path);

        let response = self.http.post(&url).json(payload).send().await.map_err(|e| {
            tracing::error!(error = %e, login_path = %login_path, "Vault login request failed");
            VaultlineError::auth(LOGIN_FAILURE_MESSAGE)
        })?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            let detail = parse_error_detail(&body);
            tracing::error!(
                status = status.as_u16(),
                login_path = %login_path,
                detail = %detail,
                "Vault rejected login"
            );
            return Err(VaultlineError::auth(LOGIN_FAILURE_MESSAGE));
        }

        let parsed: VaultResponse = serde_json::from_str(&body).map_err(|e| {
            tracing::error!(error = %e, login_path = %login_path, "Vault login response was not valid JSON");
            VaultlineError::auth(LOGIN_FAILURE_MESSAGE)
        })?;

        let auth = parsed.auth.ok_or_else(|| {
            tracing::error!(login_path = %login_path, "Vault login response carried no auth block");
            VaultlineError::auth(LOGIN_FAILURE_MESSAGE)
        })?;

        tracing::debug!(
            method = %self.auth_method(),
            lease_duration = auth.lease_duration,
            renewable = auth.renewable,
            policies = auth.policies.len(),
            "Authenticated to Vault"
        );

        Ok(SecretString::new(auth.client_token))
    }
}
