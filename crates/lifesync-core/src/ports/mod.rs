//! Port definitions (hexagonal architecture interfaces)
//!
//! This module defines the port traits that form the boundaries of the
//! sync core. Ports are interfaces the core depends on, whose
//! implementations live in adapter crates.
//!
//! ## Ports Overview
//!
//! - [`IKeyValueStore`] - Synchronous local key-value persistence
//! - [`IRemoteStore`] - Multi-device remote document store with live subscriptions
//! - [`IDurableChangeObserver`] - Receives the persistence gate's durable-change signal

pub mod key_value;
pub mod observer;
pub mod remote_store;

pub use key_value::IKeyValueStore;
pub use observer::{IDurableChangeObserver, NoopObserver};
pub use remote_store::{ChangeCallback, IRemoteStore, IRemoteSubscription};
