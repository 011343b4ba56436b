//! # Database Configuration
//!
//! Connection-pool settings for the SQLite store that backs secret rows.

use crate::errors::{Result, VaultlineError};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use validator::Validate;

/// Database configuration for the secret store.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DatabaseConfig {
    /// Database connection URL.
    #[validate(length(min = 1, message = "Database URL cannot be empty"))]
    pub url: String,

    /// Maximum number of connections in the pool.
    #[validate(range(min = 1, max = 100, message = "Max connections must be between 1 and 100"))]
    pub max_connections: u32,

    /// Minimum number of idle connections to maintain.
    pub min_connections: u32,

    /// Connection acquire timeout in seconds.
    #[validate(range(min = 1, max = 300, message = "Connect timeout must be between 1 and 300 seconds"))]
    pub connect_timeout_seconds: u64,

    /// How long a connection may sit idle before being reaped, in seconds.
    pub idle_timeout_seconds: u64,

    /// Whether to run pending migrations when the pool is created.
    pub auto_migrate: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://./data/vaultline.db".to_string(),
            max_connections: 10,
            min_connections: 1,
            connect_timeout_seconds: 30,
            idle_timeout_seconds: 600,
            auto_migrate: true,
        }
    }
}

impl DatabaseConfig {
    /// Get the connection timeout as a Duration
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }

    /// Get the idle timeout as a Duration
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_seconds)
    }

    /// Create a DatabaseConfig from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            url: std::env::var("VAULTLINE_DATABASE_URL")
                .or_else(|_| std::env::var("DATABASE_URL"))
                .unwrap_or(defaults.url),
            max_connections: std::env::var("VAULTLINE_DATABASE_MAX_CONNECTIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_connections),
            min_connections: std::env::var("VAULTLINE_DATABASE_MIN_CONNECTIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.min_connections),
            connect_timeout_seconds: std::env::var("VAULTLINE_DATABASE_CONNECT_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.connect_timeout_seconds),
            idle_timeout_seconds: std::env::var("VAULTLINE_DATABASE_IDLE_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.idle_timeout_seconds),
            auto_migrate: std::env::var("VAULTLINE_DATABASE_AUTO_MIGRATE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.auto_migrate),
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        Validate::validate(self).map_err(VaultlineError::from)?;

        if self.min_connections > self.max_connections {
            return Err(VaultlineError::config(format!(
                "Min connections ({}) cannot exceed max connections ({})",
                self.min_connections, self.max_connections
            )));
        }

        if !self.url.starts_with("sqlite:") {
            return Err(VaultlineError::config(format!(
                "Unsupported database URL '{}': only sqlite is supported",
                self.url
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = DatabaseConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.connect_timeout(), Duration::from_secs(30));
        assert_eq!(config.idle_timeout(), Duration::from_secs(600));
    }

    #[test]
    fn test_validate_rejects_min_above_max() {
        let config = DatabaseConfig {
            min_connections: 20,
            max_connections: 10,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_non_sqlite_url() {
        let config = DatabaseConfig {
            url: "postgres://localhost/vaultline".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_url() {
        let config = DatabaseConfig { url: String::new(), ..Default::default() };
        assert!(config.validate().is_err());
    }
}
