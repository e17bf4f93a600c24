//! In-memory remote document store
//!
//! One [`Snapshot`] per identity plus the live subscribers of each identity.
//! Besides implementing [`IRemoteStore`], the store exposes knobs used by
//! tests and the CLI demo: write rejection, read failure, an artificial
//! write latency, and a record of every `put` call.
//!
//! Callbacks run while the store's lock is held, so once
//! [`IRemoteSubscription::unsubscribe`] returns no callback of that
//! subscription can still be running or start later. Callbacks must not
//! call back into the store.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use lifesync_core::domain::{IdentityId, Snapshot, Version};
use lifesync_core::ports::{ChangeCallback, IRemoteStore, IRemoteSubscription};
use tracing::{debug, info, warn};

use crate::RemoteError;

/// One recorded `put` call
#[derive(Debug, Clone, PartialEq)]
pub struct PutRecord {
    pub identity: IdentityId,
    pub snapshot: Snapshot,
    /// Whether the store accepted the write
    pub accepted: bool,
}

impl PutRecord {
    pub fn version(&self) -> Version {
        self.snapshot.version
    }
}

struct Subscriber {
    id: u64,
    on_change: ChangeCallback,
}

#[derive(Default)]
struct Inner {
    documents: HashMap<IdentityId, Snapshot>,
    subscribers: HashMap<IdentityId, Vec<Subscriber>>,
    next_subscriber_id: u64,
    reject_writes: bool,
    fail_reads: bool,
    write_latency: Option<Duration>,
    puts: Vec<PutRecord>,
    gets: usize,
}

impl Inner {
    fn notify(&self, identity: &IdentityId, snapshot: &Snapshot) -> usize {
        let Some(subscribers) = self.subscribers.get(identity) else {
            return 0;
        };
        for subscriber in subscribers {
            (subscriber.on_change)(snapshot.clone());
        }
        subscribers.len()
    }
}

/// Remote document store kept in process memory
///
/// Cloning yields another handle to the same store.
#[derive(Clone, Default)]
pub struct InMemoryRemoteStore {
    inner: Arc<Mutex<Inner>>,
}

impl std::fmt::Debug for InMemoryRemoteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("InMemoryRemoteStore")
            .field("documents", &inner.documents.len())
            .field("puts", &inner.puts.len())
            .finish_non_exhaustive()
    }
}

impl InMemoryRemoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // --- fault injection ---

    /// Makes every subsequent `put` fail (and not store anything)
    pub fn set_reject_writes(&self, reject: bool) {
        self.lock().reject_writes = reject;
    }

    /// Makes every subsequent `get` fail
    pub fn set_fail_reads(&self, fail: bool) {
        self.lock().fail_reads = fail;
    }

    /// Delays every `put` by `latency` before it takes effect
    pub fn set_write_latency(&self, latency: Option<Duration>) {
        self.lock().write_latency = latency;
    }

    // --- direct document access ---

    /// Stores `snapshot` for `identity` without notifying anyone
    pub fn seed(&self, identity: &IdentityId, snapshot: Snapshot) {
        self.lock().documents.insert(identity.clone(), snapshot);
    }

    /// Current document of `identity`
    pub fn document(&self, identity: &IdentityId) -> Option<Snapshot> {
        self.lock().documents.get(identity).cloned()
    }

    /// Delivers `snapshot` to the subscribers of `identity` without storing
    /// it; returns how many subscribers were notified
    pub fn notify_subscribers(&self, identity: &IdentityId, snapshot: &Snapshot) -> usize {
        self.lock().notify(identity, snapshot)
    }

    // --- call records ---

    /// Every `put` call so far, in order
    pub fn puts(&self) -> Vec<PutRecord> {
        self.lock().puts.clone()
    }

    /// Number of `get` calls so far
    pub fn get_count(&self) -> usize {
        self.lock().gets
    }

    /// Number of live subscriptions for `identity`
    pub fn subscriber_count(&self, identity: &IdentityId) -> usize {
        self.lock()
            .subscribers
            .get(identity)
            .map_or(0, Vec::len)
    }

    /// Number of live subscriptions across all identities
    pub fn total_subscriber_count(&self) -> usize {
        self.lock().subscribers.values().map(Vec::len).sum()
    }
}

#[async_trait::async_trait]
impl IRemoteStore for InMemoryRemoteStore {
    async fn get(&self, identity: &IdentityId) -> anyhow::Result<Option<Snapshot>> {
        let mut inner = self.lock();
        inner.gets += 1;
        if inner.fail_reads {
            return Err(RemoteError::Unreachable.into());
        }
        Ok(inner.documents.get(identity).cloned())
    }

    async fn put(&self, identity: &IdentityId, snapshot: &Snapshot) -> anyhow::Result<()> {
        let latency = self.lock().write_latency;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let mut inner = self.lock();
        let accepted = !inner.reject_writes;
        inner.puts.push(PutRecord {
            identity: identity.clone(),
            snapshot: snapshot.clone(),
            accepted,
        });

        if !accepted {
            warn!(identity = %identity, version = %snapshot.version, "Rejecting remote write");
            return Err(RemoteError::WriteRejected(identity.to_string()).into());
        }

        inner.documents.insert(identity.clone(), snapshot.clone());
        let notified = inner.notify(identity, snapshot);
        debug!(
            identity = %identity,
            version = %snapshot.version,
            notified,
            "Stored remote document"
        );
        Ok(())
    }

    fn subscribe(
        &self,
        identity: &IdentityId,
        on_change: ChangeCallback,
    ) -> anyhow::Result<Box<dyn IRemoteSubscription>> {
        let mut inner = self.lock();
        let id = inner.next_subscriber_id;
        inner.next_subscriber_id += 1;
        inner
            .subscribers
            .entry(identity.clone())
            .or_default()
            .push(Subscriber { id, on_change });

        info!(identity = %identity, subscriber = id, "Remote subscription opened");

        Ok(Box::new(MemorySubscription {
            store: Arc::downgrade(&self.inner),
            identity: identity.clone(),
            id,
            active: true,
        }))
    }
}

/// Subscription handle returned by [`InMemoryRemoteStore::subscribe`]
struct MemorySubscription {
    store: Weak<Mutex<Inner>>,
    identity: IdentityId,
    id: u64,
    active: bool,
}

impl MemorySubscription {
    fn remove(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        let Some(store) = self.store.upgrade() else {
            return;
        };
        let mut inner = store.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(subscribers) = inner.subscribers.get_mut(&self.identity) {
            subscribers.retain(|s| s.id != self.id);
            if subscribers.is_empty() {
                inner.subscribers.remove(&self.identity);
            }
        }
        info!(identity = %self.identity, subscriber = self.id, "Remote subscription closed");
    }
}

impl IRemoteSubscription for MemorySubscription {
    fn unsubscribe(mut self: Box<Self>) {
        self.remove();
    }
}

impl Drop for MemorySubscription {
    fn drop(&mut self) {
        self.remove();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU64, Ordering};

    use lifesync_core::domain::{Domain, DurablePartition};

    use super::*;

    fn identity(name: &str) -> IdentityId {
        IdentityId::new(name).unwrap()
    }

    fn snapshot(version: u64) -> Snapshot {
        Snapshot::new(
            DurablePartition::new().with_domain(Domain::Tasks, serde_json::json!([])),
            Version::new(version),
        )
    }

    #[tokio::test]
    async fn test_get_missing_document() {
        let store = InMemoryRemoteStore::new();
        assert!(store.get(&identity("a")).await.unwrap().is_none());
        assert_eq!(store.get_count(), 1);
    }

    #[tokio::test]
    async fn test_put_then_get_roundtrip() {
        let store = InMemoryRemoteStore::new();
        let id = identity("a");
        let snap = snapshot(3);

        store.put(&id, &snap).await.unwrap();

        assert_eq!(store.get(&id).await.unwrap(), Some(snap));
    }

    #[tokio::test]
    async fn test_put_notifies_all_subscribers_of_identity() {
        let store = InMemoryRemoteStore::new();
        let a = identity("a");
        let seen = Arc::new(AtomicU64::new(0));

        let seen_a = seen.clone();
        let _sub_a = store
            .subscribe(
                &a,
                Box::new(move |s| {
                    seen_a.store(s.version.get(), Ordering::SeqCst);
                }),
            )
            .unwrap();
        let other_hits = Arc::new(AtomicU64::new(0));
        let hits = other_hits.clone();
        let _sub_b = store
            .subscribe(
                &identity("b"),
                Box::new(move |_| {
                    hits.fetch_add(1, Ordering::SeqCst);
                }),
            )
            .unwrap();

        store.put(&a, &snapshot(7)).await.unwrap();

        assert_eq!(seen.load(Ordering::SeqCst), 7);
        assert_eq!(other_hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unsubscribe_stops_notifications() {
        let store = InMemoryRemoteStore::new();
        let a = identity("a");
        let hits = Arc::new(AtomicU64::new(0));
        let counter = hits.clone();
        let sub = store
            .subscribe(
                &a,
                Box::new(move |_| {
                    counter.fetch_add(1, Ordering::SeqCst);
                }),
            )
            .unwrap();
        assert_eq!(store.subscriber_count(&a), 1);

        sub.unsubscribe();
        store.put(&a, &snapshot(1)).await.unwrap();

        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert_eq!(store.subscriber_count(&a), 0);
    }

    #[tokio::test]
    async fn test_dropping_handle_unsubscribes() {
        let store = InMemoryRemoteStore::new();
        let a = identity("a");
        {
            let _sub = store.subscribe(&a, Box::new(|_| {})).unwrap();
            assert_eq!(store.total_subscriber_count(), 1);
        }
        assert_eq!(store.total_subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_rejected_write_is_recorded_and_not_stored() {
        let store = InMemoryRemoteStore::new();
        let a = identity("a");
        store.set_reject_writes(true);

        let result = store.put(&a, &snapshot(1)).await;

        assert!(result.is_err());
        assert!(store.document(&a).is_none());
        let puts = store.puts();
        assert_eq!(puts.len(), 1);
        assert!(!puts[0].accepted);
        assert_eq!(puts[0].version(), Version::new(1));
    }

    #[tokio::test]
    async fn test_failed_reads() {
        let store = InMemoryRemoteStore::new();
        store.set_fail_reads(true);
        assert!(store.get(&identity("a")).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_write_latency_delays_effect() {
        let store = InMemoryRemoteStore::new();
        let a = identity("a");
        store.set_write_latency(Some(Duration::from_millis(500)));

        let writer = {
            let store = store.clone();
            let a = a.clone();
            tokio::spawn(async move { store.put(&a, &snapshot(1)).await })
        };
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(store.document(&a).is_none());

        writer.await.unwrap().unwrap();
        assert!(store.document(&a).is_some());
    }
}
