//! Domain error types
//!
//! This module defines error types specific to domain operations,
//! including identifier validation, policy table consistency and
//! snapshot decoding failures.

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Identity identifier is empty or malformed
    #[error("Invalid identity: {0}")]
    InvalidIdentity(String),

    /// ID parsing error
    #[error("Invalid ID format: {0}")]
    InvalidId(String),

    /// Unknown domain name
    #[error("Unknown domain: {0}")]
    UnknownDomain(String),

    /// The static domain policy table is inconsistent
    #[error("Domain policy table is invalid: {0}")]
    PolicyTable(String),

    /// A snapshot (or one of its domains) could not be decoded
    #[error("Snapshot decode failed: {0}")]
    SnapshotDecode(String),

    /// Generic validation failure
    #[error("Validation failed: {0}")]
    ValidationFailed(String),
}
