//! LifeSync Sync - Session lifecycle and remote replication
//!
//! Provides:
//! - The sync session manager: one explicit state machine per observed
//!   identity (load, subscribe, write, tear down)
//! - The version-stamped writer: debounced remote writes with version
//!   rollback on failure
//! - The remote listener: version guard that applies newer snapshots and
//!   discards echoes of this session's own writes
//! - The identity stream and the sync status feed
//!
//! ## Modules
//!
//! - [`manager`] - [`SyncSessionManager`] event loop
//! - [`session`] - per-identity session state
//! - [`writer`] - debounce and version bookkeeping for remote writes
//! - [`listener`] - remote notification version guard
//! - [`identity`] - sign-in / sign-out source and stream
//! - [`status`] - [`SyncStatus`] published to UIs

pub mod identity;
pub mod listener;
pub mod manager;
pub mod session;
pub mod status;
pub mod writer;

pub use identity::{IdentitySource, IdentityStream};
pub use manager::SyncSessionManager;
pub use status::SyncStatus;

use lifesync_core::domain::{DomainError, Version};
use thiserror::Error;

/// Errors that can occur in the sync runtime
#[derive(Debug, Error)]
pub enum SyncError {
    /// Every identity source handle was dropped
    #[error("Identity stream closed")]
    IdentityStreamClosed,

    /// The durable partition could not be built for a write
    #[error("Domain error: {0}")]
    DomainError(#[from] DomainError),

    /// The remote store rejected or failed a write
    #[error("Write of version {version} failed: {reason}")]
    WriteFailed { version: Version, reason: String },
}
