//! Vault HTTP client.
//!
//! A thin client over Vault's HTTP API (`/v1/...`) with four verbs: read,
//! write, delete, and the non-standard LIST. Every call runs through one
//! executor that lazily authenticates, attaches the session token, and on a
//! 4xx or timeout re-authenticates and retries exactly once when the
//! configured auth method supports it. Server errors and repeat failures
//! propagate to the caller untouched; classification into user-facing
//! errors happens a layer up.

use std::time::Duration;

use serde::Deserialize;

use crate::config::VaultConfig;
use crate::errors::{Result, VaultlineError};

use super::auth::VaultAuthenticator;

/// Header Vault reads the session token from.
const VAULT_TOKEN_HEADER: &str = "X-Vault-Token";

/// Envelope of every Vault API response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VaultResponse {
    #[serde(default)]
    pub request_id: String,
    #[serde(default)]
    pub lease_id: String,
    #[serde(default)]
    pub renewable: bool,
    #[serde(default)]
    pub lease_duration: u64,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
    #[serde(default)]
    pub warnings: Option<Vec<String>>,
    #[serde(default)]
    pub auth: Option<VaultAuthData>,
}

/// The `auth` block of a successful login response.
#[derive(Debug, Clone, Deserialize)]
pub struct VaultAuthData {
    pub client_token: String,
    #[serde(default)]
    pub accessor: String,
    #[serde(default)]
    pub policies: Vec<String>,
    #[serde(default)]
    pub lease_duration: u64,
    #[serde(default)]
    pub renewable: bool,
}

/// HTTP client for one Vault server.
///
/// Construction performs no network I/O; the first request authenticates
/// on demand.
pub struct VaultClient {
    http: reqwest::Client,
    address: String,
    auth: VaultAuthenticator,
    timeout: Duration,
}

impl VaultClient {
    pub fn new(config: &VaultConfig) -> Result<Self> {
        let timeout = config.request_timeout();
        let http = reqwest::Client::builder().timeout(timeout).build().map_err(|e| {
            VaultlineError::http(format!("Failed to build Vault HTTP client: {}", e))
        })?;
        let auth = VaultAuthenticator::new(config, http.clone())?;

        Ok(Self {
            http,
            address: config.address.trim_end_matches('/').to_string(),
            auth,
            timeout,
        })
    }

    /// Read the secret at `path`. Absence surfaces as an operation error
    /// with status 404.
    pub async fn read(&self, path: &str) -> Result<VaultResponse> {
        self.execute("read", path, |http, url| http.get(url)).await
    }

    /// Write `payload` to `path`. KV v1 mounts answer with an empty body,
    /// v2 mounts with version metadata; both parse into [`VaultResponse`].
    pub async fn write(&self, path: &str, payload: &serde_json::Value) -> Result<VaultResponse> {
        self.execute("write", path, |http, url| http.post(url).json(payload)).await
    }

    /// Delete the secret at `path`.
    pub async fn delete(&self, path: &str) -> Result<()> {
        self.execute("delete", path, |http, url| http.delete(url)).await.map(|_| ())
    }

    /// Enumerate the keys directly under `path` using Vault's LIST verb.
    /// An empty mount answers 404, which propagates like any other error.
    pub async fn list(&self, path: &str) -> Result<Vec<String>> {
        let method = reqwest::Method::from_bytes(b"LIST")
            .map_err(|e| VaultlineError::internal(format!("Invalid LIST method: {}", e)))?;

        let response = self
            .execute("list", path, move |http, url| http.request(method.clone(), url))
            .await?;

        let keys = response
            .data
            .as_ref()
            .and_then(|data| data.get("keys"))
            .and_then(|keys| keys.as_array())
            .map(|keys| keys.iter().filter_map(|k| k.as_str().map(str::to_string)).collect())
            .unwrap_or_default();
        Ok(keys)
    }

    /// Run one Vault request with the resilience contract: authenticate
    /// lazily, and on a client error (4xx or timeout) drop the session,
    /// log in again, and retry exactly once, provided the auth method can
    /// re-authenticate. The retry's outcome is final.
    async fn execute<F>(&self, operation: &str, path: &str, build: F) -> Result<VaultResponse>
    where
        F: Fn(&reqwest::Client, &str) -> reqwest::RequestBuilder,
    {
        let url = self.url_for(path);

        match self.attempt(operation, &url, &build).await {
            Err(err) if err.is_vault_client_error() && self.auth.supports_reauth() => {
                tracing::warn!(
                    operation = %operation,
                    path = %path,
                    status = ?err.vault_status(),
                    "Vault request failed with a client error; re-authenticating and retrying once"
                );
                self.auth.invalidate().await;
                self.auth.ensure_initialized().await?;
                self.attempt(operation, &url, &build).await
            }
            outcome => outcome,
        }
    }

    async fn attempt<F>(&self, operation: &str, url: &str, build: &F) -> Result<VaultResponse>
    where
        F: Fn(&reqwest::Client, &str) -> reqwest::RequestBuilder,
    {
        let token = self.auth.bearer_token().await?;

        let response = build(&self.http, url)
            .header(VAULT_TOKEN_HEADER, token.expose_secret())
            .send()
            .await
            .map_err(|e| self.transport_error(operation, e))?;

        handle_response(operation, response).await
    }

    fn transport_error(&self, operation: &str, err: reqwest::Error) -> VaultlineError {
        if err.is_timeout() {
            VaultlineError::timeout(operation, self.timeout.as_millis() as u64)
        } else {
            VaultlineError::http(format!("Vault request failed: {}", err))
        }
    }

    fn url_for(&self, path: &str) -> String {
        format!("{}/v1/{}", self.address, path.trim_start_matches('/'))
    }
}

async fn handle_response(operation: &str, response: reqwest::Response) -> Result<VaultResponse> {
    let status = response.status();
    let body = response.text().await.map_err(|e| {
        VaultlineError::http(format!("Failed to read Vault response body: {}", e))
    })?;

    if !status.is_success() {
        return Err(VaultlineError::vault_operation(
            Some(status.as_u16()),
            operation,
            parse_error_detail(&body),
        ));
    }

    // Writes to KV v1 and deletes answer 204 with no body.
    if body.trim().is_empty() {
        return Ok(VaultResponse::default());
    }

    let parsed: VaultResponse = serde_json::from_str(&body).map_err(|e| {
        VaultlineError::vault_operation(
            Some(status.as_u16()),
            operation,
            format!("Invalid JSON in Vault response: {}", e),
        )
    })?;

    if let Some(warnings) = parsed.warnings.as_deref().filter(|w| !w.is_empty()) {
        tracing::warn!(operation = %operation, warnings = ?warnings, "Vault returned warnings");
    }

    Ok(parsed)
}

/// Pull the human-readable messages out of a Vault error body
/// (`{"errors": [...]}`), falling back to the raw body when the shape is
/// unfamiliar.
pub(crate) fn parse_error_detail(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            value.get("errors").and_then(|errors| errors.as_array()).map(|errors| {
                errors.iter().filter_map(|e| e.as_str()).collect::<Vec<_>>().join("; ")
            })
        })
        .filter(|detail| !detail.is_empty())
        .unwrap_or_else(|| body.chars().take(200).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secrets::SecretString;

    fn client() -> VaultClient {
        let config = VaultConfig {
            address: "http://127.0.0.1:8200/".to_string(),
            token: Some(SecretString::new("root")),
            ..Default::default()
        };
        VaultClient::new(&config).unwrap()
    }

    #[test]
    fn test_url_for_normalizes_slashes() {
        let client = client();
        assert_eq!(
            client.url_for("secret/data/app/db-1"),
            "http://127.0.0.1:8200/v1/secret/data/app/db-1"
        );
        assert_eq!(
            client.url_for("/secret/data/app/db-1"),
            "http://127.0.0.1:8200/v1/secret/data/app/db-1"
        );
    }

    #[test]
    fn test_parse_error_detail_prefers_errors_array() {
        let body = r#"{"errors":["permission denied","token expired"]}"#;
        assert_eq!(parse_error_detail(body), "permission denied; token expired");

        assert_eq!(parse_error_detail("plain text failure"), "plain text failure");
        assert_eq!(parse_error_detail(r#"{"errors":[]}"#), r#"{"errors":[]}"#);
    }

    #[test]
    fn test_construction_performs_no_io() {
        // Nothing is listening on this address; construction must still work.
        let config = VaultConfig {
            address: "http://192.0.2.1:8200".to_string(),
            token: Some(SecretString::new("root")),
            ..Default::default()
        };
        assert!(VaultClient::new(&config).is_ok());
    }

    #[test]
    fn test_response_parses_with_missing_fields() {
        let parsed: VaultResponse = serde_json::from_str(r#"{"data":{"value":"x"}}"#).unwrap();
        assert!(parsed.data.is_some());
        assert!(parsed.auth.is_none());
        assert!(parsed.request_id.is_empty());
    }
}
