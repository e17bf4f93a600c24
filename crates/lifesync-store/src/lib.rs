//! LifeSync Store - Local key-value persistence
//!
//! Synchronous storage backends for the local durable store:
//! - [`MemoryKeyValueStore`] - process-local map, for tests and ephemeral runs
//! - [`FileKeyValueStore`] - one file per key in a directory, atomic writes
//!
//! ## Architecture
//!
//! This crate implements the `IKeyValueStore` port from `lifesync-core`.
//! It is a driven (secondary) adapter in the hexagonal architecture.
//!
//! ## Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use lifesync_core::LocalSnapshotStore;
//! use lifesync_store::FileKeyValueStore;
//!
//! # fn example() -> anyhow::Result<()> {
//! let kv = FileKeyValueStore::open("/home/user/.local/share/lifesync/state")?;
//! let local = LocalSnapshotStore::new(Arc::new(kv), "lifesync.snapshot");
//! let restored = local.read_once();
//! # Ok(())
//! # }
//! ```

pub mod file;
pub mod memory;

pub use file::FileKeyValueStore;
pub use memory::MemoryKeyValueStore;

use std::path::PathBuf;

/// Errors that can occur during local storage operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Key is empty or would escape the store directory
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// The storage directory could not be created or is not a directory
    #[error("Storage directory unavailable: {0}")]
    DirectoryUnavailable(PathBuf),

    /// A value is not valid UTF-8
    #[error("Corrupt value for key {0}")]
    CorruptValue(String),

    /// An I/O error occurred
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Rejects keys that cannot be used as a single file name
pub(crate) fn validate_key(key: &str) -> Result<(), StoreError> {
    if key.trim().is_empty() {
        return Err(StoreError::InvalidKey("key must not be empty".to_string()));
    }
    if key == "." || key == ".." || key.contains(|c: char| matches!(c, '/' | '\\' | '\0')) {
        return Err(StoreError::InvalidKey(key.to_string()));
    }
    Ok(())
}
