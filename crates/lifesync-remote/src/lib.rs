//! LifeSync Remote - Remote document store adapters
//!
//! Provides:
//! - [`InMemoryRemoteStore`] - a multi-device document store living in
//!   process memory. Several sync runtimes sharing one instance behave like
//!   several devices signed in to the same account.
//!
//! ## Architecture
//!
//! This crate implements the `IRemoteStore` port from `lifesync-core`.
//! Like a hosted document database without server-side merge, every `put`
//! replaces the identity's document and is delivered to every live
//! subscriber of that identity, the writing device included.

pub mod memory;

pub use memory::{InMemoryRemoteStore, PutRecord};

use thiserror::Error;

/// Errors returned by the in-memory remote store
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// The store was configured to reject writes
    #[error("Write rejected for identity {0}")]
    WriteRejected(String),

    /// The store was configured to fail reads
    #[error("Remote unreachable")]
    Unreachable,
}
