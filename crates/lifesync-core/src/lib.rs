//! LifeSync Core - State container and domain logic
//!
//! This crate contains the synchronous half of the sync core:
//! - **Domain** - the state tree, its domains and persistence policies,
//!   the closed action set, snapshots and identifiers
//! - **Reducer** - the pure transition function `(state, action) -> state'`
//! - **Persistence gate** - durable vs. system classification of actions
//! - **State container** - the single owner and writer of the state tree
//! - **Local durable store** - snapshot persistence over a key-value port
//! - **Port definitions** - `IKeyValueStore`, `IRemoteStore`,
//!   `IDurableChangeObserver`
//!
//! # Architecture
//!
//! This crate follows the hexagonal (ports & adapters) architecture pattern.
//! It has no async runtime dependency; the session lifecycle, debounced
//! writer and remote listener live in `lifesync-sync`.

pub mod config;
pub mod container;
pub mod domain;
pub mod gate;
pub mod local_store;
pub mod ports;
pub mod reducer;

pub use container::{SharedStateContainer, StateContainer};
pub use gate::{classify, ChangeClass};
pub use local_store::LocalSnapshotStore;
