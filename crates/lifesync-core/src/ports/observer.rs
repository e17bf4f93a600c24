//! Durable-change observer port
//!
//! The state container calls [`IDurableChangeObserver::durable_change_observed`]
//! after every durable action, once the new state is in place and the
//! local snapshot is written. The sync runtime implements it to learn that
//! the user edited something and a remote write should be scheduled.

use crate::domain::ActionKind;

/// Receives the persistence gate's durable-change signal
pub trait IDurableChangeObserver: Send + Sync {
    /// Called synchronously from the dispatch path; must not block
    fn durable_change_observed(&self, kind: ActionKind);
}

/// Observer that ignores every signal (no sync runtime attached)
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl IDurableChangeObserver for NoopObserver {
    fn durable_change_observed(&self, _kind: ActionKind) {}
}
