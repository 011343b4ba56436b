//! # Error Types
//!
//! Crate-wide error types for the secret-management subsystem using `thiserror`.

/// Custom result type for vaultline operations
pub type Result<T> = std::result::Result<T, VaultlineError>;

/// Main error type for the secret-management subsystem
#[derive(thiserror::Error, Debug)]
pub enum VaultlineError {
    /// Configuration errors (missing role/token for the selected auth
    /// method, malformed addresses). Fatal at construction, never retried.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Vault login failures. The raw Vault response is logged where the
    /// failure happens; the message here stays generic.
    #[error("Authentication error: {message}")]
    Auth { message: String },

    /// Resource not found errors raised by the metadata store. Absent rows
    /// in manager results are `Ok(None)`/`Ok(false)`, not this variant.
    #[error("Resource not found: {resource_type} with ID '{id}'")]
    NotFound { resource_type: String, id: String },

    /// A Vault data operation returned a non-2xx status. The client records
    /// the raw Vault error text; the manager boundary logs it and replaces
    /// it with a stable user-safe message before the error escapes.
    #[error("Vault operation '{operation}' failed: {message}")]
    VaultOperation { status: Option<u16>, operation: String, message: String },

    /// Malformed `path#key` reference in a BYOS record.
    #[error("Invalid secret reference '{reference}': {reason}")]
    Reference { reference: String, reason: String },

    /// Database and storage errors
    #[error("Database error: {context}")]
    Database {
        #[source]
        source: sqlx::Error,
        context: String,
    },

    /// Serialization/deserialization errors
    #[error("Serialization error: {context}")]
    Serialization {
        #[source]
        source: serde_json::Error,
        context: String,
    },

    /// I/O errors with additional context
    #[error("I/O error: {context}")]
    Io {
        #[source]
        source: std::io::Error,
        context: String,
    },

    /// HTTP transport errors (connection refused, TLS, malformed response
    /// bodies) that never produced a Vault status code.
    #[error("HTTP request failed: {message}")]
    Http { message: String },

    /// A Vault call exceeded the configured request timeout.
    #[error("Operation timed out: {operation} after {duration_ms}ms")]
    Timeout { operation: String, duration_ms: u64 },

    /// Validation errors
    #[error("Validation error: {message}")]
    Validation { message: String, field: Option<String> },

    /// Internal errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl VaultlineError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config { message: message.into() }
    }

    /// Create an authentication error
    pub fn auth<S: Into<String>>(message: S) -> Self {
        Self::Auth { message: message.into() }
    }

    /// Create a not found error
    pub fn not_found<R: Into<String>, I: Into<String>>(resource_type: R, id: I) -> Self {
        Self::NotFound { resource_type: resource_type.into(), id: id.into() }
    }

    /// Create a Vault operation error
    pub fn vault_operation<O: Into<String>, M: Into<String>>(
        status: Option<u16>,
        operation: O,
        message: M,
    ) -> Self {
        Self::VaultOperation { status, operation: operation.into(), message: message.into() }
    }

    /// Create a reference resolution error
    pub fn reference<R: Into<String>, S: Into<String>>(reference: R, reason: S) -> Self {
        Self::Reference { reference: reference.into(), reason: reason.into() }
    }

    /// Create a database error with context
    pub fn database<S: Into<String>>(source: sqlx::Error, context: S) -> Self {
        Self::Database { source, context: context.into() }
    }

    /// Create an HTTP transport error
    pub fn http<S: Into<String>>(message: S) -> Self {
        Self::Http { message: message.into() }
    }

    /// Create a timeout error
    pub fn timeout<S: Into<String>>(operation: S, duration_ms: u64) -> Self {
        Self::Timeout { operation: operation.into(), duration_ms }
    }

    /// Create a validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation { message: message.into(), field: None }
    }

    /// Create a validation error with field information
    pub fn validation_field<S: Into<String>, F: Into<String>>(message: S, field: F) -> Self {
        Self::Validation { message: message.into(), field: Some(field.into()) }
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal { message: message.into() }
    }

    /// Get the HTTP status code that should be returned for this error
    pub fn status_code(&self) -> u16 {
        match self {
            VaultlineError::Config { .. } => 500,
            VaultlineError::Auth { .. } => 401,
            VaultlineError::NotFound { .. } => 404,
            VaultlineError::VaultOperation { status, .. } => status.unwrap_or(502),
            VaultlineError::Reference { .. } => 400,
            VaultlineError::Database { .. } => 500,
            VaultlineError::Serialization { .. } => 400,
            VaultlineError::Io { .. } => 500,
            VaultlineError::Http { .. } => 502,
            VaultlineError::Timeout { .. } => 408,
            VaultlineError::Validation { .. } => 400,
            VaultlineError::Internal { .. } => 500,
        }
    }

    /// The Vault status code carried by this error, if any.
    pub fn vault_status(&self) -> Option<u16> {
        match self {
            VaultlineError::VaultOperation { status, .. } => *status,
            _ => None,
        }
    }

    /// Whether this error is the client-error category the resilient
    /// executor re-authenticates on: an HTTP 4xx from Vault, or a request
    /// timeout (which is surfaced in the same category).
    pub fn is_vault_client_error(&self) -> bool {
        match self {
            VaultlineError::VaultOperation { status: Some(status), .. } => {
                (400..500).contains(status)
            }
            VaultlineError::Timeout { .. } => true,
            _ => false,
        }
    }
}

// Error conversions for common external error types
impl From<sqlx::Error> for VaultlineError {
    fn from(error: sqlx::Error) -> Self {
        Self::Database { source: error, context: "Database operation failed".to_string() }
    }
}

impl From<std::io::Error> for VaultlineError {
    fn from(error: std::io::Error) -> Self {
        Self::Io { source: error, context: "I/O operation failed".to_string() }
    }
}

impl From<serde_json::Error> for VaultlineError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization { source: error, context: "JSON serialization failed".to_string() }
    }
}

impl From<validator::ValidationErrors> for VaultlineError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let message = errors
            .field_errors()
            .iter()
            .map(|(field, field_errors)| {
                let error_messages: Vec<String> = field_errors
                    .iter()
                    .map(|e| {
                        e.message.as_ref().map_or("Invalid value".to_string(), |m| m.to_string())
                    })
                    .collect();
                format!("{}: {}", field, error_messages.join(", "))
            })
            .collect::<Vec<_>>()
            .join("; ");

        Self::validation(format!("Validation failed: {}", message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_constructors() {
        let error = VaultlineError::config("missing role");
        assert!(matches!(error, VaultlineError::Config { .. }));
        assert_eq!(error.to_string(), "Configuration error: missing role");

        let error = VaultlineError::reference("bad-ref", "missing '#' separator");
        assert!(matches!(error, VaultlineError::Reference { .. }));
        assert!(error.to_string().contains("bad-ref"));

        let error = VaultlineError::not_found("secret", "sec-1");
        assert_eq!(error.to_string(), "Resource not found: secret with ID 'sec-1'");
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(VaultlineError::config("x").status_code(), 500);
        assert_eq!(VaultlineError::auth("x").status_code(), 401);
        assert_eq!(VaultlineError::not_found("secret", "id").status_code(), 404);
        assert_eq!(VaultlineError::vault_operation(Some(403), "read", "x").status_code(), 403);
        assert_eq!(VaultlineError::vault_operation(None, "read", "x").status_code(), 502);
        assert_eq!(VaultlineError::reference("a#b", "x").status_code(), 400);
        assert_eq!(VaultlineError::timeout("read", 1000).status_code(), 408);
    }

    #[test]
    fn test_vault_client_error_classification() {
        assert!(VaultlineError::vault_operation(Some(401), "read", "x").is_vault_client_error());
        assert!(VaultlineError::vault_operation(Some(404), "list", "x").is_vault_client_error());
        assert!(VaultlineError::vault_operation(Some(499), "read", "x").is_vault_client_error());
        assert!(VaultlineError::timeout("read", 30_000).is_vault_client_error());

        assert!(!VaultlineError::vault_operation(Some(500), "read", "x").is_vault_client_error());
        assert!(!VaultlineError::vault_operation(None, "read", "x").is_vault_client_error());
        assert!(!VaultlineError::auth("x").is_vault_client_error());
        assert!(!VaultlineError::http("connection refused").is_vault_client_error());
    }

    #[test]
    fn test_error_conversions() {
        let json_error = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let error: VaultlineError = json_error.into();
        assert!(matches!(error, VaultlineError::Serialization { .. }));

        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let error: VaultlineError = io_error.into();
        assert!(matches!(error, VaultlineError::Io { .. }));
    }
}
