//! State container
//!
//! Holds the single in-memory [`StateTree`] and is its only writer. Every
//! change goes through [`StateContainer::dispatch`], which runs the pure
//! transition function, classifies the action through the persistence
//! gate and, for durable changes, writes the local snapshot and signals
//! the durable-change observer.
//!
//! ```text
//! dispatch(action) ──→ reduce ──→ classify ──Durable──→ local snapshot write
//!                                                   └──→ observer (sync runtime)
//! ```
//!
//! The container also remembers which identity its state belongs to. The
//! owner is restored from the local snapshot and written back with it.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, trace};

use crate::domain::{
    validate_policy_table, Action, DomainError, DurablePartition, IdentityId, StateTree,
    DOMAIN_POLICIES,
};
use crate::gate::{classify, ChangeClass};
use crate::local_store::LocalSnapshotStore;
use crate::ports::{IDurableChangeObserver, NoopObserver};
use crate::reducer::reduce;

// ============================================================================
// StateContainer
// ============================================================================

/// Owner of the state tree
pub struct StateContainer {
    state: StateTree,
    /// Identity the state belongs to
    owner: Option<IdentityId>,
    local_store: Option<LocalSnapshotStore>,
    observer: Arc<dyn IDurableChangeObserver>,
    /// Skip-first-write guard: local writes start after the first render
    rendered: bool,
}

impl std::fmt::Debug for StateContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateContainer")
            .field("owner", &self.owner)
            .field("local_store", &self.local_store)
            .field("rendered", &self.rendered)
            .finish_non_exhaustive()
    }
}

impl StateContainer {
    /// Creates the container from the local snapshot, if any
    ///
    /// The initial tree is the default tree hydrated with the stored
    /// partition, so never-persisted domains always start from defaults.
    ///
    /// # Errors
    /// Returns [`DomainError::PolicyTable`] if the domain policy table is
    /// inconsistent
    pub fn new(
        local_store: Option<LocalSnapshotStore>,
        observer: Arc<dyn IDurableChangeObserver>,
    ) -> Result<Self, DomainError> {
        validate_policy_table(DOMAIN_POLICIES)?;

        let (state, owner) = match local_store.as_ref().and_then(LocalSnapshotStore::read_record) {
            Some(record) => {
                debug!(owner = ?record.owner, "Restoring state from local snapshot");
                (
                    reduce(&StateTree::default(), &Action::Hydrate(record.state)),
                    record.owner,
                )
            }
            None => (StateTree::default(), None),
        };

        Ok(Self {
            state,
            owner,
            local_store,
            observer,
            rendered: false,
        })
    }

    /// Creates a container with no local storage and no observer
    pub fn in_memory() -> Result<Self, DomainError> {
        Self::new(None, Arc::new(NoopObserver))
    }

    /// Replaces the durable-change observer
    pub fn set_observer(&mut self, observer: Arc<dyn IDurableChangeObserver>) {
        self.observer = observer;
    }

    /// Current state
    pub fn state(&self) -> &StateTree {
        &self.state
    }

    pub fn owner(&self) -> Option<&IdentityId> {
        self.owner.as_ref()
    }

    /// Binds the state to `identity` and rewrites the local snapshot
    ///
    /// Does not touch the tree; the caller resets it first when the
    /// identity changes.
    pub fn bind_owner(&mut self, identity: IdentityId) {
        if self.owner.as_ref() == Some(&identity) {
            return;
        }
        debug!(from = ?self.owner, to = %identity, "Binding state to identity");
        self.owner = Some(identity);
        self.persist_locally();
    }

    /// Opens the skip-first-write guard
    ///
    /// Until this is called, durable changes update memory and notify the
    /// observer but do not touch local storage, so the value just loaded
    /// from it is never written straight back.
    pub fn mark_rendered(&mut self) {
        self.rendered = true;
    }

    /// Applies `action` and returns its classification
    pub fn dispatch(&mut self, action: Action) -> ChangeClass {
        let kind = action.kind();
        self.state = reduce(&self.state, &action);
        let class = classify(kind);

        trace!(action = %kind, class = ?class, "Dispatched action");

        if class.is_durable() {
            self.persist_locally();
            self.observer.durable_change_observed(kind);
        }

        class
    }

    /// The durable partition of the current state
    pub fn durable_partition(&self) -> Result<DurablePartition, DomainError> {
        DurablePartition::from_tree(&self.state)
    }

    fn persist_locally(&self) {
        let Some(store) = &self.local_store else {
            return;
        };
        if !self.rendered {
            debug!("Skipping local snapshot write before first render");
            return;
        }
        match self.durable_partition() {
            Ok(partition) => store.write(&partition, self.owner.as_ref()),
            Err(e) => debug!(error = %e, "Durable partition unavailable, local write skipped"),
        }
    }
}

// ============================================================================
// SharedStateContainer
// ============================================================================

/// Cloneable handle to the application's one state container
///
/// The lock is held only for the duration of a synchronous call; callers
/// never hold it across an await point.
#[derive(Debug, Clone)]
pub struct SharedStateContainer {
    inner: Arc<Mutex<StateContainer>>,
}

impl SharedStateContainer {
    pub fn new(container: StateContainer) -> Self {
        Self {
            inner: Arc::new(Mutex::new(container)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, StateContainer> {
        // The transition function cannot leave the tree half-written, so a
        // poisoned lock still guards a consistent state.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn dispatch(&self, action: Action) -> ChangeClass {
        self.lock().dispatch(action)
    }

    /// Clone of the current state
    pub fn state(&self) -> StateTree {
        self.lock().state().clone()
    }

    /// Runs `f` against the current state without cloning it
    pub fn read<R>(&self, f: impl FnOnce(&StateTree) -> R) -> R {
        f(self.lock().state())
    }

    pub fn durable_partition(&self) -> Result<DurablePartition, DomainError> {
        self.lock().durable_partition()
    }

    pub fn mark_rendered(&self) {
        self.lock().mark_rendered();
    }

    pub fn owner(&self) -> Option<IdentityId> {
        self.lock().owner().cloned()
    }

    pub fn bind_owner(&self, identity: IdentityId) {
        self.lock().bind_owner(identity);
    }

    pub fn set_observer(&self, observer: Arc<dyn IDurableChangeObserver>) {
        self.lock().set_observer(observer);
    }
}
