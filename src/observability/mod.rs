//! # Observability
//!
//! Structured logging for the secret subsystem. Secret material is kept out
//! of log output by construction; everything sensitive is wrapped in
//! [`crate::secrets::SecretString`].

pub mod logging;

pub use logging::{init_logging, LoggingConfig};
