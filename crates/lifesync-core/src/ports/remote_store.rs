//! Remote document store port (driven/secondary port)
//!
//! One document per identity, holding the latest [`Snapshot`]. There is no
//! server-side merge: a `put` replaces the document, and every subscriber of
//! the identity (the writer included) is notified with the new snapshot.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because errors at port boundaries are
//!   adapter-specific; a failed `put` is a rejected or unreachable write.
//! - `subscribe` is synchronous registration; notifications arrive later,
//!   on whatever task the adapter delivers them from.
//! - The returned [`IRemoteSubscription`] must be consumed by
//!   `unsubscribe` to stop notifications; adapters also stop on drop.

use crate::domain::{IdentityId, Snapshot};

/// Callback invoked with every snapshot written for the subscribed identity
pub type ChangeCallback = Box<dyn Fn(Snapshot) + Send + Sync>;

/// Handle to a live subscription
pub trait IRemoteSubscription: Send {
    /// Stops notifications; no callback runs after this returns
    fn unsubscribe(self: Box<Self>);
}

/// Port trait for the remote multi-device document store
#[async_trait::async_trait]
pub trait IRemoteStore: Send + Sync {
    /// Loads the snapshot of `identity`, `None` if it was never written
    async fn get(&self, identity: &IdentityId) -> anyhow::Result<Option<Snapshot>>;

    /// Replaces the snapshot of `identity`
    ///
    /// # Errors
    /// Returns an error if the write was rejected or the store is unreachable
    async fn put(&self, identity: &IdentityId, snapshot: &Snapshot) -> anyhow::Result<()>;

    /// Registers `on_change` for every future write of `identity`
    fn subscribe(
        &self,
        identity: &IdentityId,
        on_change: ChangeCallback,
    ) -> anyhow::Result<Box<dyn IRemoteSubscription>>;
}
