//! Local key-value storage port (driven/secondary port)
//!
//! ## Design Notes
//!
//! - Synchronous on purpose: the state container writes the durable
//!   partition inside the dispatch path, before dispatch returns.
//! - Values are opaque strings; the local snapshot store owns the encoding.
//! - Uses `anyhow::Result` because storage errors are adapter-specific.

/// Port trait for synchronous local key-value persistence
pub trait IKeyValueStore: Send + Sync {
    /// Reads the value stored under `key`, `None` if absent
    fn get(&self, key: &str) -> anyhow::Result<Option<String>>;

    /// Stores `value` under `key`, replacing any previous value
    fn set(&self, key: &str, value: &str) -> anyhow::Result<()>;

    /// Removes `key`; removing an absent key is not an error
    fn remove(&self, key: &str) -> anyhow::Result<()>;
}
