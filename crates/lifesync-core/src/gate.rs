//! Persistence gate
//!
//! Decides, per action kind, whether a dispatched action is a durable
//! change (must reach local storage and the remote store) or a system
//! change (UI focus, data read from a live source, hydration, resets)
//! that must never cause an outbound write by itself.

use serde::{Deserialize, Serialize};

use crate::domain::{ActionKind, DomainPolicy};

/// Classification of a dispatched action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeClass {
    /// User-originated edit that must be persisted and synced
    Durable,
    /// Transient or bookkeeping change; never triggers a write
    System,
}

impl ChangeClass {
    pub fn is_durable(&self) -> bool {
        matches!(self, ChangeClass::Durable)
    }
}

/// Classification of every action kind
pub const CLASSIFICATION: &[(ActionKind, ChangeClass)] = &[
    (ActionKind::AddTask, ChangeClass::Durable),
    (ActionKind::UpdateTask, ChangeClass::Durable),
    (ActionKind::ToggleTask, ChangeClass::Durable),
    (ActionKind::RemoveTask, ChangeClass::Durable),
    (ActionKind::AddHabit, ChangeClass::Durable),
    (ActionKind::LogHabit, ChangeClass::Durable),
    (ActionKind::RemoveHabit, ChangeClass::Durable),
    (ActionKind::AddRoutine, ChangeClass::Durable),
    (ActionKind::RemoveRoutine, ChangeClass::Durable),
    (ActionKind::SetDayType, ChangeClass::Durable),
    (ActionKind::SetPreferences, ChangeClass::Durable),
    (ActionKind::SetFocus, ChangeClass::System),
    (ActionKind::SelectItem, ChangeClass::System),
    (ActionKind::HealthLoading, ChangeClass::System),
    (ActionKind::HealthFetched, ChangeClass::System),
    (ActionKind::CalendarLoading, ChangeClass::System),
    (ActionKind::CalendarFetched, ChangeClass::System),
    (ActionKind::Hydrate, ChangeClass::System),
    (ActionKind::Reset, ChangeClass::System),
];

/// Classifies an action kind
///
/// Kinds missing from [`CLASSIFICATION`] fall back to
/// [`fallback_class`].
pub fn classify(kind: ActionKind) -> ChangeClass {
    CLASSIFICATION
        .iter()
        .find(|(k, _)| *k == kind)
        .map(|(_, class)| *class)
        .unwrap_or_else(|| fallback_class(kind))
}

/// Rule for kinds without an explicit entry
///
/// Whole-tree bookkeeping, UI and never-persisted domains are `System`;
/// edits of persisted domains are `Durable`.
pub fn fallback_class(kind: ActionKind) -> ChangeClass {
    match kind.domain().map(|domain| domain.policy()) {
        Some(DomainPolicy::Replace) | Some(DomainPolicy::Merge) => ChangeClass::Durable,
        Some(DomainPolicy::NeverPersisted) | Some(DomainPolicy::UiOnly) | None => {
            ChangeClass::System
        }
    }
}
