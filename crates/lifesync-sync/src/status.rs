//! Sync status feed
//!
//! The manager publishes its coarse state on a `watch` channel so a UI can
//! show "saving..." or "offline" badges. Nothing in the runtime reads it
//! back.

use lifesync_core::domain::{IdentityId, Version};
use serde::Serialize;

/// Coarse synchronization state of the active session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SyncStatus {
    /// No identity signed in
    #[default]
    Idle,
    /// Initial remote load in progress
    Loading { identity: IdentityId },
    /// Subscribed and up to date as far as this device knows
    Synced {
        identity: IdentityId,
        version: Version,
    },
    /// A remote write is in flight
    Writing {
        identity: IdentityId,
        version: Version,
    },
    /// The last remote write failed; edits continue locally
    Offline {
        identity: IdentityId,
        version: Version,
        last_error: String,
    },
}

impl SyncStatus {
    /// Identity of the active session, if any
    pub fn identity(&self) -> Option<&IdentityId> {
        match self {
            Self::Idle => None,
            Self::Loading { identity }
            | Self::Synced { identity, .. }
            | Self::Writing { identity, .. }
            | Self::Offline { identity, .. } => Some(identity),
        }
    }

    /// Last version known to the active session
    pub fn version(&self) -> Option<Version> {
        match self {
            Self::Idle | Self::Loading { .. } => None,
            Self::Synced { version, .. }
            | Self::Writing { version, .. }
            | Self::Offline { version, .. } => Some(*version),
        }
    }
}

impl std::fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Loading { identity } => write!(f, "loading ({identity})"),
            Self::Synced { identity, version } => write!(f, "synced ({identity} @ v{version})"),
            Self::Writing { identity, version } => write!(f, "writing ({identity} @ v{version})"),
            Self::Offline {
                identity,
                version,
                last_error,
            } => write!(f, "offline ({identity} @ v{version}): {last_error}"),
        }
    }
}
