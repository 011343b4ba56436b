//! KV engine adapter.
//!
//! Vault's KV secrets engine speaks two wire formats. Version 1 stores the
//! payload directly and addresses data and metadata at the same path.
//! Version 2 wraps write payloads in a `data` envelope, nests read responses
//! one level deeper, and splits the path space into `/data/` and
//! `/metadata/` trees. [`KvAdapter`] concentrates every version-specific
//! decision (payload shape, response extraction, path derivation) so the
//! managers above it never branch on the engine version.

use crate::config::{KvVersion, VaultConfig};
use crate::errors::{Result, VaultlineError};
use crate::secrets::types::SecretMap;
use serde_json::{json, Value};

/// Field Vault-owned secrets are stored under within the KV data map.
const VALUE_FIELD: &str = "value";

/// Version-aware payload and path logic for a KV mount.
#[derive(Debug, Clone)]
pub struct KvAdapter {
    version: KvVersion,
    base_path: String,
    metadata_base: Option<String>,
}

impl KvAdapter {
    pub fn new(
        version: KvVersion,
        base_path: impl Into<String>,
        metadata_base: Option<String>,
    ) -> Self {
        Self {
            version,
            base_path: base_path.into().trim_end_matches('/').to_string(),
            metadata_base: metadata_base.map(|p| p.trim_end_matches('/').to_string()),
        }
    }

    pub fn from_config(config: &VaultConfig) -> Self {
        Self::new(
            config.kv_version,
            config.secret_path.clone(),
            config.secret_metadata_path.clone(),
        )
    }

    pub fn version(&self) -> KvVersion {
        self.version
    }

    /// Build the JSON body for writing a secret value.
    ///
    /// V1 takes the fields directly; v2 expects them wrapped in a `data`
    /// envelope.
    pub fn build_write_payload(&self, value: &str) -> Value {
        match self.version {
            KvVersion::V1 => json!({ VALUE_FIELD: value }),
            KvVersion::V2 => json!({ "data": { VALUE_FIELD: value } }),
        }
    }

    /// Extract the stored secret string from a read response's `data` field.
    ///
    /// V1 responses carry the fields directly; v2 responses nest them under
    /// a further `data` key next to `metadata`.
    pub fn extract_secret_value<'a>(&self, data: &'a Value) -> Result<&'a str> {
        let fields = self.data_fields(data)?;
        fields.get(VALUE_FIELD).and_then(Value::as_str).ok_or_else(|| {
            VaultlineError::vault_operation(
                None,
                "read",
                format!("Secret payload has no string '{}' field", VALUE_FIELD),
            )
        })
    }

    /// Extract the full field map from a read response's `data` field.
    pub fn extract_data_map<'a>(&self, data: &'a Value) -> Result<&'a SecretMap> {
        self.data_fields(data)
    }

    fn data_fields<'a>(&self, data: &'a Value) -> Result<&'a SecretMap> {
        let fields = match self.version {
            KvVersion::V1 => data.as_object(),
            KvVersion::V2 => data.get("data").and_then(Value::as_object),
        };

        fields.ok_or_else(|| {
            VaultlineError::vault_operation(
                None,
                "read",
                format!("Unexpected KV v{} response shape", self.version),
            )
        })
    }

    /// Path a Vault-owned secret is written to and read from:
    /// `{base}/{name}-{id}`.
    pub fn secret_path(&self, name: &str, id: &str) -> String {
        format!("{}/{}-{}", self.base_path, name, id)
    }

    /// Path used to delete a Vault-owned secret.
    ///
    /// V1 has a single path space, so this equals [`Self::secret_path`].
    /// For v2 the configured metadata base wins when present; otherwise the
    /// last `/data/` segment of the secret path is rewritten to
    /// `/metadata/`. Deleting at the metadata path removes every version of
    /// the secret permanently.
    pub fn metadata_path(&self, name: &str, id: &str) -> String {
        match self.version {
            KvVersion::V1 => self.secret_path(name, id),
            KvVersion::V2 => match &self.metadata_base {
                Some(base) => format!("{}/{}-{}", base, name, id),
                None => rewrite_data_segment(&self.secret_path(name, id)),
            },
        }
    }

    /// Base path enumerated by connectivity checks.
    pub fn list_base_path(&self) -> String {
        match self.version {
            KvVersion::V1 => self.base_path.clone(),
            KvVersion::V2 => match &self.metadata_base {
                Some(base) => base.clone(),
                None => rewrite_data_segment(&self.base_path),
            },
        }
    }
}

/// Rewrite the last `/data/` segment of a KV v2 path to `/metadata/`.
/// Only the final occurrence moves, so user-chosen base paths that happen
/// to contain `data` elsewhere survive intact.
fn rewrite_data_segment(path: &str) -> String {
    match path.rsplit_once("/data/") {
        Some((head, tail)) => format!("{}/metadata/{}", head, tail),
        None => path.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v1() -> KvAdapter {
        KvAdapter::new(KvVersion::V1, "secret/vaultline", None)
    }

    fn v2() -> KvAdapter {
        KvAdapter::new(KvVersion::V2, "secret/data/vaultline", None)
    }

    #[test]
    fn test_write_payload_shapes() {
        assert_eq!(v1().build_write_payload("s3cret"), json!({ "value": "s3cret" }));
        assert_eq!(v2().build_write_payload("s3cret"), json!({ "data": { "value": "s3cret" } }));
    }

    #[test]
    fn test_extract_secret_value() {
        let v1_data = json!({ "value": "plain" });
        assert_eq!(v1().extract_secret_value(&v1_data).unwrap(), "plain");

        let v2_data = json!({ "data": { "value": "nested" }, "metadata": { "version": 3 } });
        assert_eq!(v2().extract_secret_value(&v2_data).unwrap(), "nested");
    }

    #[test]
    fn test_extract_secret_value_missing_field() {
        let err = v2().extract_secret_value(&json!({ "data": {} })).unwrap_err();
        assert!(matches!(err, VaultlineError::VaultOperation { .. }));

        let err = v1().extract_secret_value(&json!({ "value": 42 })).unwrap_err();
        assert!(matches!(err, VaultlineError::VaultOperation { .. }));
    }

    #[test]
    fn test_extract_data_map() {
        let v1_data = json!({ "api_key": "abc", "other": "def" });
        let map = v1().extract_data_map(&v1_data).unwrap();
        assert_eq!(map.len(), 2);

        let v2_data = json!({ "data": { "api_key": "abc" }, "metadata": {} });
        let map = v2().extract_data_map(&v2_data).unwrap();
        assert_eq!(map.get("api_key").and_then(Value::as_str), Some("abc"));

        assert!(v2().extract_data_map(&json!({ "data": "not-a-map" })).is_err());
    }

    #[test]
    fn test_secret_path_joins_name_and_id() {
        assert_eq!(v2().secret_path("My_Service__", "abc123"), "secret/data/vaultline/My_Service__-abc123");
        assert_eq!(v1().secret_path("db", "1"), "secret/vaultline/db-1");
    }

    #[test]
    fn test_trailing_slashes_are_trimmed() {
        let adapter = KvAdapter::new(KvVersion::V2, "secret/data/app/", Some("kv/meta/".into()));
        assert_eq!(adapter.secret_path("a", "1"), "secret/data/app/a-1");
        assert_eq!(adapter.metadata_path("a", "1"), "kv/meta/a-1");
    }

    #[test]
    fn test_metadata_path_v1_equals_secret_path() {
        let adapter = v1();
        assert_eq!(adapter.metadata_path("db", "1"), adapter.secret_path("db", "1"));
    }

    #[test]
    fn test_metadata_path_v2_rewrites_data_segment() {
        assert_eq!(v2().metadata_path("db", "1"), "secret/metadata/vaultline/db-1");

        // Only the last /data/ segment moves.
        let nested = KvAdapter::new(KvVersion::V2, "secret/data/teams/data/app", None);
        assert_eq!(nested.metadata_path("db", "1"), "secret/data/teams/metadata/app/db-1");
    }

    #[test]
    fn test_metadata_path_v2_with_override_base() {
        let adapter =
            KvAdapter::new(KvVersion::V2, "secret/data/app", Some("secret/metadata/app".into()));
        assert_eq!(adapter.metadata_path("db", "1"), "secret/metadata/app/db-1");
    }

    #[test]
    fn test_metadata_path_v2_bare_data_base() {
        let adapter = KvAdapter::new(KvVersion::V2, "secret/data", None);
        assert_eq!(adapter.metadata_path("db", "1"), "secret/metadata/db-1");
    }

    #[test]
    fn test_list_base_path() {
        assert_eq!(v1().list_base_path(), "secret/vaultline");
        assert_eq!(v2().list_base_path(), "secret/metadata/vaultline");

        let overridden =
            KvAdapter::new(KvVersion::V2, "secret/data/app", Some("secret/metadata/app".into()));
        assert_eq!(overridden.list_base_path(), "secret/metadata/app");
    }
}
