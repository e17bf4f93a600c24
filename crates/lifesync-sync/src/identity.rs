//! Identity stream
//!
//! [`IdentitySource`] is held by whatever signs users in and out;
//! [`IdentityStream`] is consumed by the session manager. Backed by a
//! `watch` channel, so a burst of changes collapses to the latest value.

use std::sync::Arc;

use lifesync_core::domain::IdentityId;
use tokio::sync::watch;
use tracing::info;

use crate::SyncError;

/// Emits sign-in, sign-out and identity switches
///
/// Clones share one channel; the stream closes when the last clone drops.
#[derive(Debug, Clone)]
pub struct IdentitySource {
    tx: Arc<watch::Sender<Option<IdentityId>>>,
}

impl IdentitySource {
    /// Creates a source with no identity signed in
    pub fn new() -> Self {
        Self::with_initial(None)
    }

    pub fn with_initial(initial: Option<IdentityId>) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx: Arc::new(tx) }
    }

    pub fn sign_in(&self, identity: IdentityId) {
        info!(identity = %identity, "Identity signed in");
        self.tx.send_replace(Some(identity));
    }

    pub fn sign_out(&self) {
        info!("Identity signed out");
        self.tx.send_replace(None);
    }

    pub fn current(&self) -> Option<IdentityId> {
        self.tx.borrow().clone()
    }

    /// A new stream starting at the current value
    pub fn subscribe(&self) -> IdentityStream {
        IdentityStream {
            rx: self.tx.subscribe(),
        }
    }
}

impl Default for IdentitySource {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiving side of an [`IdentitySource`]
#[derive(Debug)]
pub struct IdentityStream {
    rx: watch::Receiver<Option<IdentityId>>,
}

impl IdentityStream {
    /// Current value, marking it as seen
    pub fn current(&mut self) -> Option<IdentityId> {
        self.rx.borrow_and_update().clone()
    }

    /// Waits for the next emitted value
    ///
    /// # Errors
    /// Returns [`SyncError::IdentityStreamClosed`] once every source handle
    /// has been dropped
    pub async fn changed(&mut self) -> Result<Option<IdentityId>, SyncError> {
        self.rx
            .changed()
            .await
            .map_err(|_| SyncError::IdentityStreamClosed)?;
        Ok(self.rx.borrow_and_update().clone())
    }
}
