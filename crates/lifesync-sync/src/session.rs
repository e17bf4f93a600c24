//! Session state
//!
//! A [`Session`] is the runtime binding of one identity to its load,
//! subscription and write lifecycle. The version counter and the
//! durable-change flag live here, so nothing leaks from one session into
//! the next when the identity switches.

use std::time::Duration;

use lifesync_core::domain::{IdentityId, SessionId, Version};
use lifesync_core::ports::IRemoteSubscription;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;

use crate::writer::{FireOutcome, VersionStampedWriter};

// ============================================================================
// Session
// ============================================================================

/// One identity's sync lifecycle
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    identity: IdentityId,
    /// Version of the snapshot this session last loaded, applied or wrote
    pub(crate) local_version: Version,
    /// Set by the first durable action of the session; gates remote writes
    durable_change_observed: bool,
    pub(crate) writer: VersionStampedWriter,
}

impl Session {
    pub fn new(identity: IdentityId, debounce: Duration) -> Self {
        Self {
            id: SessionId::new(),
            identity,
            local_version: Version::ZERO,
            durable_change_observed: false,
            writer: VersionStampedWriter::new(debounce),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn identity(&self) -> &IdentityId {
        &self.identity
    }

    pub fn local_version(&self) -> Version {
        self.local_version
    }

    pub fn durable_change_observed(&self) -> bool {
        self.durable_change_observed
    }

    /// Clears the durable-change flag once the initial load has settled
    pub(crate) fn reset_durable_change(&mut self) {
        self.durable_change_observed = false;
    }

    /// Records a durable edit and (re)schedules the remote write
    pub(crate) fn mark_durable_change(&mut self, now: Instant) {
        self.durable_change_observed = true;
        self.writer.schedule(now);
    }

    /// Consumes an elapsed write deadline
    ///
    /// Nothing is written until a durable edit was observed in this
    /// session; a deadline reached without one is dropped.
    pub(crate) fn take_due_write(&mut self) -> FireOutcome {
        if !self.durable_change_observed {
            debug!(identity = %self.identity, "No durable edit in this session, write dropped");
            self.writer.cancel();
            return FireOutcome::Idle;
        }
        self.writer.fire(&mut self.local_version)
    }
}

// ============================================================================
// SessionState
// ============================================================================

/// State machine driven by the identity stream
pub enum SessionState {
    /// No identity; nothing is loaded, subscribed or written
    NoIdentity,
    /// The initial remote load for `session` is running
    Loading {
        session: Session,
        load: JoinHandle<()>,
    },
    /// Loaded; notifications and writes flow
    ///
    /// `subscription` is `None` if subscribing failed; writes still happen.
    Subscribed {
        session: Session,
        subscription: Option<Box<dyn IRemoteSubscription>>,
    },
}

impl std::fmt::Debug for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoIdentity => write!(f, "NoIdentity"),
            Self::Loading { session, .. } => f
                .debug_struct("Loading")
                .field("session", &session.id)
                .field("identity", &session.identity)
                .finish(),
            Self::Subscribed {
                session,
                subscription,
            } => f
                .debug_struct("Subscribed")
                .field("session", &session.id)
                .field("identity", &session.identity)
                .field("live", &subscription.is_some())
                .finish(),
        }
    }
}

impl SessionState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::NoIdentity => "no_identity",
            Self::Loading { .. } => "loading",
            Self::Subscribed { .. } => "subscribed",
        }
    }

    pub fn session(&self) -> Option<&Session> {
        match self {
            Self::NoIdentity => None,
            Self::Loading { session, .. } | Self::Subscribed { session, .. } => Some(session),
        }
    }

    pub fn identity(&self) -> Option<&IdentityId> {
        self.session().map(Session::identity)
    }

    /// The subscribed session, if it is `id`
    pub(crate) fn subscribed_mut(&mut self, id: SessionId) -> Option<&mut Session> {
        match self {
            Self::Subscribed { session, .. } if session.id == id => Some(session),
            _ => None,
        }
    }

    /// Deadline of the subscribed session's pending write
    pub(crate) fn write_deadline(&self) -> Option<Instant> {
        match self {
            Self::Subscribed { session, .. } => session.writer.deadline(),
            _ => None,
        }
    }
}
