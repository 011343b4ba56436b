//! # Structured Logging
//!
//! Tracing-based logging setup for the secret subsystem. Embedding
//! applications that already install a subscriber can skip this entirely;
//! `init_logging` quietly steps aside when a global subscriber exists.

use crate::errors::Result;
use serde::{Deserialize, Serialize};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset, e.g. `info` or
    /// `vaultline=debug`.
    pub log_level: String,

    /// Emit JSON-formatted log lines instead of the human-readable format.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { log_level: "info".to_string(), json: false }
    }
}

impl LoggingConfig {
    /// Create a LoggingConfig from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            log_level: std::env::var("VAULTLINE_LOG_LEVEL").unwrap_or(defaults.log_level),
            json: std::env::var("VAULTLINE_LOG_FORMAT")
                .map(|format| format.eq_ignore_ascii_case("json"))
                .unwrap_or(defaults.json),
        }
    }
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over the configured level. Token material
/// never reaches log output; secret values are held in
/// [`crate::secrets::SecretString`] which redacts itself on formatting.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone()));

    let installed = if config.json {
        tracing::subscriber::set_global_default(
            FmtSubscriber::builder().with_env_filter(filter).json().finish(),
        )
    } else {
        tracing::subscriber::set_global_default(
            FmtSubscriber::builder().with_env_filter(filter).finish(),
        )
    };

    if installed.is_err() {
        // Subscriber already set elsewhere (e.g. integration tests); ignore.
    }

    Ok(())
}
