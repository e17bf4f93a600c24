//! Local durable store
//!
//! Persists the durable partition of the state tree through an
//! [`IKeyValueStore`] under a single key. Reads happen once at startup;
//! writes happen synchronously on every durable change. Both are best
//! effort: failures are logged and never reach the dispatch caller.
//!
//! The record carries the identity the state belongs to, so a restart
//! under a different identity can be told apart from a resumed session.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::domain::{DurablePartition, IdentityId};
use crate::ports::IKeyValueStore;

/// Default key of the local snapshot
pub const DEFAULT_SNAPSHOT_KEY: &str = "lifesync.snapshot";

/// What is stored under the snapshot key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalRecord {
    pub state: DurablePartition,
    /// Identity the state was last bound to; `None` before any sign-in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<IdentityId>,
    pub saved_at: DateTime<Utc>,
}

/// Snapshot persistence on top of a key-value store
#[derive(Clone)]
pub struct LocalSnapshotStore {
    kv: Arc<dyn IKeyValueStore>,
    key: String,
}

impl std::fmt::Debug for LocalSnapshotStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalSnapshotStore")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

impl LocalSnapshotStore {
    pub fn new(kv: Arc<dyn IKeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            kv,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Reads the stored record
    ///
    /// Returns `None` when nothing is stored, when the store fails, or when
    /// the stored value does not decode.
    pub fn read_record(&self) -> Option<LocalRecord> {
        let raw = match self.kv.get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!(key = %self.key, "No local snapshot stored");
                return None;
            }
            Err(e) => {
                warn!(key = %self.key, error = %e, "Failed to read local snapshot");
                return None;
            }
        };

        match serde_json::from_str::<LocalRecord>(&raw) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(key = %self.key, error = %e, "Discarding undecodable local snapshot");
                None
            }
        }
    }

    /// Reads the stored durable partition (startup only)
    pub fn read_once(&self) -> Option<DurablePartition> {
        self.read_record().map(|record| record.state)
    }

    /// Writes `state` owned by `owner`; failures are logged and swallowed
    pub fn write(&self, state: &DurablePartition, owner: Option<&IdentityId>) {
        let record = LocalRecord {
            state: state.clone(),
            owner: owner.cloned(),
            saved_at: Utc::now(),
        };
        let encoded = match serde_json::to_string(&record) {
            Ok(encoded) => encoded,
            Err(e) => {
                warn!(key = %self.key, error = %e, "Failed to encode local snapshot");
                return;
            }
        };
        if let Err(e) = self.kv.set(&self.key, &encoded) {
            warn!(key = %self.key, error = %e, "Failed to write local snapshot");
        }
    }

    /// Removes the stored snapshot
    pub fn clear(&self) -> anyhow::Result<()> {
        self.kv.remove(&self.key)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;
    use crate::domain::{Domain, StateTree, Task};

    #[derive(Default)]
    struct MapStore {
        values: Mutex<HashMap<String, String>>,
        fail_writes: bool,
    }

    impl IKeyValueStore for MapStore {
        fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
            Ok(self.values.lock().unwrap().get(key).cloned())
        }

        fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
            if self.fail_writes {
                anyhow::bail!("disk full");
            }
            self.values
                .lock()
                .unwrap()
                .insert(key.to_string(), value.to_string());
            Ok(())
        }

        fn remove(&self, key: &str) -> anyhow::Result<()> {
            self.values.lock().unwrap().remove(key);
            Ok(())
        }
    }

    #[test]
    fn read_once_on_empty_store_is_none() {
        let store = LocalSnapshotStore::new(Arc::new(MapStore::default()), DEFAULT_SNAPSHOT_KEY);
        assert!(store.read_once().is_none());
    }

    #[test]
    fn write_then_read() {
        let store = LocalSnapshotStore::new(Arc::new(MapStore::default()), DEFAULT_SNAPSHOT_KEY);
        let mut tree = StateTree::default();
        tree.tasks.push(Task::new("persist me"));
        let partition = DurablePartition::from_tree(&tree).unwrap();

        store.write(&partition, None);

        let loaded = store.read_once().unwrap();
        assert_eq!(loaded, partition);
        assert!(loaded.contains(Domain::Tasks));
    }

    #[test]
    fn garbage_is_discarded() {
        let kv = Arc::new(MapStore::default());
        kv.set(DEFAULT_SNAPSHOT_KEY, "{not json").unwrap();
        let store = LocalSnapshotStore::new(kv, DEFAULT_SNAPSHOT_KEY);
        assert!(store.read_once().is_none());
    }

    #[test]
    fn write_failure_is_swallowed() {
        let kv = Arc::new(MapStore {
            fail_writes: true,
            ..MapStore::default()
        });
        let store = LocalSnapshotStore::new(kv, DEFAULT_SNAPSHOT_KEY);
        store.write(&DurablePartition::new(), None);
        assert!(store.read_once().is_none());
    }

    #[test]
    fn owner_is_stored_with_the_state() {
        let store = LocalSnapshotStore::new(Arc::new(MapStore::default()), "k");
        let owner = IdentityId::new("alice").unwrap();

        store.write(&DurablePartition::new(), Some(&owner));

        assert_eq!(store.read_record().unwrap().owner, Some(owner));
    }

    #[test]
    fn record_without_owner_still_decodes() {
        let kv = Arc::new(MapStore::default());
        kv.set(
            "k",
            r#"{"state":{},"saved_at":"2026-01-01T00:00:00Z"}"#,
        )
        .unwrap();
        let store = LocalSnapshotStore::new(kv, "k");

        let record = store.read_record().unwrap();
        assert!(record.owner.is_none());
    }

    #[test]
    fn clear_removes_record() {
        let store = LocalSnapshotStore::new(Arc::new(MapStore::default()), "k");
        store.write(&DurablePartition::new(), None);
        assert!(store.read_once().is_some());
        store.clear().unwrap();
        assert!(store.read_once().is_none());
    }
}
