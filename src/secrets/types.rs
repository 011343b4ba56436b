//! Core types shared by the secret managers.
//!
//! [`SecretString`] keeps token material and secret payloads out of logs and
//! serialized output. [`SecretMap`] is the canonical in-memory shape of a
//! secret: a JSON object mapping field names to values. [`VaultReference`]
//! is the parsed form of a `path#key` pointer into an externally managed
//! Vault tree.

use crate::errors::{Result, VaultlineError};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// A secret payload: field names mapped to JSON values. Keys iterate in
/// sorted order, so serialized payloads are deterministic.
pub type SecretMap = serde_json::Map<String, serde_json::Value>;

/// A string wrapper that redacts its contents in Debug, Display, and
/// serialization, and zeroes its memory on drop.
///
/// Vault tokens and service-account JWTs travel through logging-heavy code
/// paths; wrapping them here means a stray `{:?}` or structured-log field
/// prints `[REDACTED]` instead of the credential. The real value is only
/// reachable through an explicit `expose_secret()` call.
///
/// Deserialization accepts real values (config files carry actual tokens);
/// serialization always emits `"[REDACTED]"`, so a config round-tripped
/// through serde loses the secret.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretString(String);

impl SecretString {
    /// Creates a new SecretString from a string value.
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// Exposes the underlying secret value. Never log the result.
    pub fn expose_secret(&self) -> &str {
        &self.0
    }

    /// Returns true if the secret is empty, without exposing the value.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for SecretString {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str("[REDACTED]")
    }
}

impl<'de> Deserialize<'de> for SecretString {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Ok(SecretString(value))
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretString([REDACTED])")
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl PartialEq for SecretString {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for SecretString {}

impl From<String> for SecretString {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for SecretString {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl Default for SecretString {
    fn default() -> Self {
        Self::new("")
    }
}

/// A parsed `path#key` reference to a single field of an externally managed
/// Vault secret.
///
/// `path` addresses the secret within Vault (for KV v2 it includes the
/// `/data/` segment, e.g. `secret/data/shared/stripe`) and `key` names one
/// field of that secret's data map.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct VaultReference {
    pub path: String,
    pub key: String,
}

impl VaultReference {
    /// Parse a `path#key` reference string.
    ///
    /// The first `#` separates path from key. A reference without `#`, or
    /// with an empty path or key, is rejected; callers treat that as a
    /// fatal input error rather than skipping the field.
    pub fn parse(reference: &str) -> Result<Self> {
        let trimmed = reference.trim();
        let (path, key) = trimmed.split_once('#').ok_or_else(|| {
            VaultlineError::reference(reference, "expected '<vault-path>#<key>' format")
        })?;

        if path.is_empty() {
            return Err(VaultlineError::reference(reference, "Vault path is empty"));
        }
        if key.is_empty() {
            return Err(VaultlineError::reference(reference, "key is empty"));
        }

        Ok(Self { path: path.to_string(), key: key.to_string() })
    }
}

impl fmt::Display for VaultReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.path, self.key)
    }
}
