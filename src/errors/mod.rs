//! # Error Handling
//!
//! Crate-wide error handling for the secret-management subsystem, built on
//! `thiserror`. The single [`VaultlineError`] enum covers the construction,
//! authentication, Vault-protocol, reference-resolution, and storage failure
//! modes; everything returns the [`Result`] alias.

pub mod types;

pub use types::{Result, VaultlineError};
