//! Sync session manager
//!
//! Drives one [`SessionState`] machine from a single event loop. Every
//! asynchronous piece of work (the initial load, remote notifications,
//! remote writes) runs outside the loop and reports back as a
//! [`SessionEvent`] tagged with the [`SessionId`] it was started under;
//! events of any session other than the active one are dropped.
//!
//! ## Flow
//!
//! ```text
//! identity stream ──→ NoIdentity ──→ Loading ──→ Subscribed
//!                                      │            │   ▲
//!                          get(identity)            │   │ notifications
//!                                      ▼            ▼   │
//!                                  Hydrate    debounce ──→ put(snapshot, v)
//! ```
//!
//! Once subscribed, the document is read a second time and the result goes
//! through the same version guard as a notification. A write that landed
//! between the initial load and the subscription is picked up that way.
//!
//! The identity the state tree belongs to is kept by the container and
//! persisted with the local snapshot, so an identity change is detected
//! across restarts as well.
//!
//! The state container signals durable edits through a [`ChannelObserver`]
//! installed by [`SyncSessionManager::new`].

use std::sync::Arc;
use std::time::Duration;

use lifesync_core::config::SyncConfig;
use lifesync_core::domain::{Action, ActionKind, IdentityId, SessionId, Snapshot, Version};
use lifesync_core::ports::{ChangeCallback, IDurableChangeObserver, IRemoteStore, IRemoteSubscription};
use lifesync_core::SharedStateContainer;
use tokio::sync::{mpsc, watch};
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::identity::IdentityStream;
use crate::listener::{apply_remote, RemoteOutcome};
use crate::session::{Session, SessionState};
use crate::status::SyncStatus;
use crate::writer::FireOutcome;
use crate::SyncError;

// ============================================================================
// Events
// ============================================================================

/// Completion of asynchronous work started by the manager
#[derive(Debug)]
enum SessionEvent {
    Loaded {
        session: SessionId,
        result: Result<Option<Snapshot>, String>,
    },
    Remote {
        session: SessionId,
        snapshot: Snapshot,
    },
    Written {
        session: SessionId,
        version: Version,
        result: Result<(), String>,
    },
}

// ============================================================================
// Durable-change observer
// ============================================================================

/// Forwards the state container's durable-change signal to the manager
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<ActionKind>,
}

impl IDurableChangeObserver for ChannelObserver {
    fn durable_change_observed(&self, kind: ActionKind) {
        if self.tx.send(kind).is_err() {
            trace!(action = %kind, "Sync manager stopped, durable change not forwarded");
        }
    }
}

// ============================================================================
// SyncSessionManager
// ============================================================================

/// Binds the state container to the remote store for the signed-in identity
pub struct SyncSessionManager {
    container: SharedStateContainer,
    remote: Arc<dyn IRemoteStore>,
    identity: IdentityStream,
    debounce: Duration,
    state: SessionState,
    durable_rx: mpsc::UnboundedReceiver<ActionKind>,
    events_tx: mpsc::UnboundedSender<SessionEvent>,
    events_rx: mpsc::UnboundedReceiver<SessionEvent>,
    status_tx: watch::Sender<SyncStatus>,
}

impl std::fmt::Debug for SyncSessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncSessionManager")
            .field("state", &self.state)
            .field("debounce", &self.debounce)
            .finish_non_exhaustive()
    }
}

impl SyncSessionManager {
    /// Creates the manager and attaches its observer to `container`
    pub fn new(
        container: SharedStateContainer,
        remote: Arc<dyn IRemoteStore>,
        identity: IdentityStream,
        debounce: Duration,
    ) -> Self {
        let (durable_tx, durable_rx) = mpsc::unbounded_channel();
        container.set_observer(Arc::new(ChannelObserver { tx: durable_tx }));

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (status_tx, _) = watch::channel(SyncStatus::Idle);

        Self {
            container,
            remote,
            identity,
            debounce,
            state: SessionState::NoIdentity,
            durable_rx,
            events_tx,
            events_rx,
            status_tx,
        }
    }

    pub fn from_config(
        container: SharedStateContainer,
        remote: Arc<dyn IRemoteStore>,
        identity: IdentityStream,
        config: &SyncConfig,
    ) -> Self {
        Self::new(container, remote, identity, config.debounce())
    }

    /// Receiver for status updates
    pub fn status(&self) -> watch::Receiver<SyncStatus> {
        self.status_tx.subscribe()
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    // ========================================================================
    // Event loop
    // ========================================================================

    /// Runs until `shutdown` is cancelled
    ///
    /// On exit the active session is torn down: its subscription is closed
    /// and any pending write deadline is dropped.
    ///
    /// # Errors
    /// Returns [`SyncError::IdentityStreamClosed`] if the identity source
    /// goes away before shutdown
    pub async fn run(mut self, shutdown: CancellationToken) -> Result<(), SyncError> {
        info!(
            debounce_ms = self.debounce.as_millis() as u64,
            "Sync session manager starting"
        );

        let initial = self.identity.current();
        self.on_identity(initial);

        let result = loop {
            let deadline = self.state.write_deadline();

            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    info!("Shutdown signal received");
                    break Ok(());
                }

                changed = self.identity.changed() => match changed {
                    Ok(next) => self.on_identity(next),
                    Err(e) => {
                        warn!(error = %e, "Identity stream closed");
                        break Err(e);
                    }
                },

                Some(event) = self.events_rx.recv() => self.on_event(event),

                Some(kind) = self.durable_rx.recv() => self.on_durable_change(kind),

                _ = sleep_until_deadline(deadline), if deadline.is_some() => self.on_deadline(),
            }
        };

        self.teardown();
        self.publish(SyncStatus::Idle);
        info!("Sync session manager stopped");
        result
    }

    fn on_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Loaded { session, result } => self.on_loaded(session, result),
            SessionEvent::Remote { session, snapshot } => self.on_remote(session, snapshot),
            SessionEvent::Written {
                session,
                version,
                result,
            } => self.on_written(session, version, result),
        }
    }

    // ========================================================================
    // Identity transitions
    // ========================================================================

    fn on_identity(&mut self, next: Option<IdentityId>) {
        let Some(identity) = next else {
            if self.state.session().is_some() {
                self.teardown();
            }
            self.publish(SyncStatus::Idle);
            return;
        };

        if self.state.identity() == Some(&identity) {
            debug!(identity = %identity, "Identity re-emitted, keeping session");
            return;
        }

        self.teardown();

        // The owner survives sign-out and restarts
        if let Some(previous) = self.container.owner().filter(|owner| *owner != identity) {
            info!(from = %previous, to = %identity, "Identity switched, resetting state");
            self.container.dispatch(Action::Reset);
        }
        self.container.bind_owner(identity.clone());

        self.begin_loading(identity);
    }

    fn begin_loading(&mut self, identity: IdentityId) {
        let session = Session::new(identity.clone(), self.debounce);
        let session_id = session.id();
        info!(identity = %identity, session_id = %session_id, "Loading remote snapshot");

        let remote = Arc::clone(&self.remote);
        let events = self.events_tx.clone();
        let load = tokio::spawn(async move {
            let result = remote.get(&identity).await.map_err(|e| format!("{e:#}"));
            // The manager may already be gone
            let _ = events.send(SessionEvent::Loaded {
                session: session_id,
                result,
            });
        });

        self.publish(SyncStatus::Loading {
            identity: session.identity().clone(),
        });
        self.state = SessionState::Loading { session, load };
    }

    fn teardown(&mut self) {
        match std::mem::replace(&mut self.state, SessionState::NoIdentity) {
            SessionState::NoIdentity => {}
            SessionState::Loading { session, load } => {
                load.abort();
                info!(
                    identity = %session.identity(),
                    session_id = %session.id(),
                    "Session torn down during load"
                );
            }
            SessionState::Subscribed {
                mut session,
                subscription,
            } => {
                let dropped_write = session.writer.is_pending();
                session.writer.cancel();
                if let Some(subscription) = subscription {
                    subscription.unsubscribe();
                }
                info!(
                    identity = %session.identity(),
                    session_id = %session.id(),
                    version = %session.local_version(),
                    dropped_write,
                    "Session torn down"
                );
            }
        }
    }

    // ========================================================================
    // Load and subscribe
    // ========================================================================

    fn on_loaded(&mut self, id: SessionId, result: Result<Option<Snapshot>, String>) {
        let is_active = matches!(&self.state, SessionState::Loading { session, .. } if session.id() == id);
        if !is_active {
            debug!(session_id = %id, "Discarding load result of inactive session");
            return;
        }
        let SessionState::Loading { mut session, .. } =
            std::mem::replace(&mut self.state, SessionState::NoIdentity)
        else {
            return;
        };

        match result {
            Ok(Some(snapshot)) => {
                info!(
                    identity = %session.identity(),
                    session_id = %id,
                    version = %snapshot.version,
                    "Remote snapshot loaded"
                );
                self.container.dispatch(Action::Hydrate(snapshot.state));
                session.local_version = snapshot.version;
            }
            Ok(None) => {
                info!(
                    identity = %session.identity(),
                    session_id = %id,
                    "No remote snapshot yet, keeping local state"
                );
            }
            Err(error) => {
                warn!(
                    identity = %session.identity(),
                    session_id = %id,
                    error = %error,
                    "Remote load failed, continuing with local state"
                );
            }
        }

        // Edits made while loading do not count for this session
        let mut dropped = 0usize;
        while self.durable_rx.try_recv().is_ok() {
            dropped += 1;
        }
        if dropped > 0 {
            debug!(dropped, "Dropped durable changes made during load");
        }
        session.reset_durable_change();

        let subscription = self.subscribe(&session);
        if subscription.is_some() {
            self.catch_up(&session);
        }
        self.publish(SyncStatus::Synced {
            identity: session.identity().clone(),
            version: session.local_version(),
        });
        self.state = SessionState::Subscribed {
            session,
            subscription,
        };
    }

    fn subscribe(&self, session: &Session) -> Option<Box<dyn IRemoteSubscription>> {
        let session_id = session.id();
        let events = self.events_tx.clone();
        let on_change: ChangeCallback = Box::new(move |snapshot| {
            let _ = events.send(SessionEvent::Remote {
                session: session_id,
                snapshot,
            });
        });

        match self.remote.subscribe(session.identity(), on_change) {
            Ok(subscription) => {
                info!(
                    identity = %session.identity(),
                    session_id = %session_id,
                    "Subscribed to remote changes"
                );
                Some(subscription)
            }
            Err(e) => {
                warn!(
                    identity = %session.identity(),
                    session_id = %session_id,
                    error = %format!("{e:#}"),
                    "Remote subscription failed, live updates disabled for this session"
                );
                None
            }
        }
    }

    /// Re-reads the document after subscribing and reports it as a
    /// notification
    fn catch_up(&self, session: &Session) {
        let session_id = session.id();
        let identity = session.identity().clone();
        let remote = Arc::clone(&self.remote);
        let events = self.events_tx.clone();
        tokio::spawn(async move {
            match remote.get(&identity).await {
                Ok(Some(snapshot)) => {
                    let _ = events.send(SessionEvent::Remote {
                        session: session_id,
                        snapshot,
                    });
                }
                Ok(None) => {}
                Err(e) => {
                    debug!(
                        identity = %identity,
                        session_id = %session_id,
                        error = %format!("{e:#}"),
                        "Catch-up read failed, relying on notifications"
                    );
                }
            }
        });
    }

    fn on_remote(&mut self, id: SessionId, snapshot: Snapshot) {
        let Some(session) = self.state.subscribed_mut(id) else {
            debug!(
                session_id = %id,
                version = %snapshot.version,
                "Discarding notification of inactive session"
            );
            return;
        };

        let outcome = apply_remote(&self.container, &mut session.local_version, snapshot);
        let RemoteOutcome::Applied { from, to } = outcome else {
            return;
        };
        info!(
            identity = %session.identity(),
            from = %from,
            to = %to,
            "Applied remote snapshot"
        );
        let status = settled_status(session);
        self.publish(status);
    }

    // ========================================================================
    // Writes
    // ========================================================================

    fn on_durable_change(&mut self, kind: ActionKind) {
        match &mut self.state {
            SessionState::Subscribed { session, .. } => {
                debug!(action = %kind, identity = %session.identity(), "Durable change observed");
                session.mark_durable_change(Instant::now());
            }
            other => {
                debug!(
                    action = %kind,
                    state = other.name(),
                    "Durable change outside a subscribed session, not scheduling"
                );
            }
        }
    }

    fn on_deadline(&mut self) {
        let SessionState::Subscribed { session, .. } = &mut self.state else {
            return;
        };
        let version = match session.take_due_write() {
            FireOutcome::Write(version) => version,
            FireOutcome::Queued | FireOutcome::Idle => return,
        };

        let snapshot = match self.container.durable_partition() {
            Ok(partition) => Snapshot::new(partition, version),
            Err(e) => {
                warn!(error = %e, version = %version, "Cannot build snapshot, write skipped");
                session
                    .writer
                    .complete(version, false, &mut session.local_version, Instant::now());
                return;
            }
        };

        let identity = session.identity().clone();
        let session_id = session.id();
        info!(
            identity = %identity,
            session_id = %session_id,
            version = %version,
            "Writing snapshot to remote store"
        );

        let remote = Arc::clone(&self.remote);
        let events = self.events_tx.clone();
        let target = identity.clone();
        tokio::spawn(async move {
            let result = remote
                .put(&target, &snapshot)
                .await
                .map_err(|e| format!("{e:#}"));
            let _ = events.send(SessionEvent::Written {
                session: session_id,
                version,
                result,
            });
        });

        self.publish(SyncStatus::Writing { identity, version });
    }

    fn on_written(&mut self, id: SessionId, version: Version, result: Result<(), String>) {
        let Some(session) = self.state.subscribed_mut(id) else {
            debug!(
                session_id = %id,
                version = %version,
                "Discarding write result of inactive session"
            );
            return;
        };

        session.writer.complete(
            version,
            result.is_ok(),
            &mut session.local_version,
            Instant::now(),
        );

        let status = match result {
            Ok(()) => {
                info!(identity = %session.identity(), version = %version, "Remote write succeeded");
                settled_status(session)
            }
            Err(reason) => {
                let error = SyncError::WriteFailed { version, reason };
                warn!(
                    identity = %session.identity(),
                    local_version = %session.local_version(),
                    error = %error,
                    "Remote write failed, version rolled back"
                );
                SyncStatus::Offline {
                    identity: session.identity().clone(),
                    version: session.local_version(),
                    last_error: error.to_string(),
                }
            }
        };
        self.publish(status);
    }

    fn publish(&self, status: SyncStatus) {
        self.status_tx.send_replace(status);
    }
}

/// Status of a subscribed session with no failure to report
fn settled_status(session: &Session) -> SyncStatus {
    match session.writer.in_flight() {
        Some(version) => SyncStatus::Writing {
            identity: session.identity().clone(),
            version,
        },
        None => SyncStatus::Synced {
            identity: session.identity().clone(),
            version: session.local_version(),
        },
    }
}

async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
