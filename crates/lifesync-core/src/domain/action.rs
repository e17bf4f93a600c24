//! The closed set of actions accepted by the state container
//!
//! [`Action`] carries the payload; [`ActionKind`] is its fieldless tag,
//! used by the persistence gate's classification table.

use std::fmt::{self, Display, Formatter};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::entities::{
    CalendarEvent, DayType, Habit, PreferencesPatch, Routine, Task, TaskPatch, View,
};
use super::newtypes::ItemId;
use super::snapshot::DurablePartition;
use super::state::Domain;

/// A dispatched intent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum Action {
    // --- tasks ---
    AddTask(Task),
    UpdateTask { id: ItemId, patch: TaskPatch },
    ToggleTask { id: ItemId },
    RemoveTask { id: ItemId },

    // --- habits ---
    AddHabit(Habit),
    /// Toggles completion of the habit on `date`
    LogHabit { id: ItemId, date: NaiveDate },
    RemoveHabit { id: ItemId },

    // --- routines ---
    AddRoutine(Routine),
    RemoveRoutine { id: ItemId },

    // --- preferences ---
    /// Inserts, replaces or (with `None`) removes a day type
    SetDayType {
        key: String,
        day_type: Option<DayType>,
    },
    SetPreferences(PreferencesPatch),

    // --- ui ---
    SetFocus(View),
    SelectItem(Option<ItemId>),

    // --- live external reads ---
    HealthLoading,
    HealthFetched {
        steps: Option<u64>,
        sleep_minutes: Option<u32>,
        fetched_at: chrono::DateTime<chrono::Utc>,
    },
    CalendarLoading,
    CalendarFetched {
        events: Vec<CalendarEvent>,
        fetched_at: chrono::DateTime<chrono::Utc>,
    },

    // --- sync bookkeeping ---
    /// Merges a (partial) snapshot into the tree following the domain policies
    Hydrate(DurablePartition),
    /// Resets every domain to its default
    Reset,
}

/// Tag of an [`Action`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    AddTask,
    UpdateTask,
    ToggleTask,
    RemoveTask,
    AddHabit,
    LogHabit,
    RemoveHabit,
    AddRoutine,
    RemoveRoutine,
    SetDayType,
    SetPreferences,
    SetFocus,
    SelectItem,
    HealthLoading,
    HealthFetched,
    CalendarLoading,
    CalendarFetched,
    Hydrate,
    Reset,
}

impl ActionKind {
    pub const ALL: [ActionKind; 19] = [
        ActionKind::AddTask,
        ActionKind::UpdateTask,
        ActionKind::ToggleTask,
        ActionKind::RemoveTask,
        ActionKind::AddHabit,
        ActionKind::LogHabit,
        ActionKind::RemoveHabit,
        ActionKind::AddRoutine,
        ActionKind::RemoveRoutine,
        ActionKind::SetDayType,
        ActionKind::SetPreferences,
        ActionKind::SetFocus,
        ActionKind::SelectItem,
        ActionKind::HealthLoading,
        ActionKind::HealthFetched,
        ActionKind::CalendarLoading,
        ActionKind::CalendarFetched,
        ActionKind::Hydrate,
        ActionKind::Reset,
    ];

    /// The domain this kind of action writes, `None` for whole-tree actions
    pub fn domain(&self) -> Option<Domain> {
        match self {
            ActionKind::AddTask
            | ActionKind::UpdateTask
            | ActionKind::ToggleTask
            | ActionKind::RemoveTask => Some(Domain::Tasks),
            ActionKind::AddHabit | ActionKind::LogHabit | ActionKind::RemoveHabit => {
                Some(Domain::Habits)
            }
            ActionKind::AddRoutine | ActionKind::RemoveRoutine => Some(Domain::Routines),
            ActionKind::SetDayType | ActionKind::SetPreferences => Some(Domain::Preferences),
            ActionKind::SetFocus | ActionKind::SelectItem => Some(Domain::Ui),
            ActionKind::HealthLoading | ActionKind::HealthFetched => Some(Domain::Health),
            ActionKind::CalendarLoading | ActionKind::CalendarFetched => Some(Domain::Calendar),
            ActionKind::Hydrate | ActionKind::Reset => None,
        }
    }
}

impl Display for ActionKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

impl Action {
    /// Returns the tag of this action
    pub fn kind(&self) -> ActionKind {
        match self {
            Action::AddTask(_) => ActionKind::AddTask,
            Action::UpdateTask { .. } => ActionKind::UpdateTask,
            Action::ToggleTask { .. } => ActionKind::ToggleTask,
            Action::RemoveTask { .. } => ActionKind::RemoveTask,
            Action::AddHabit(_) => ActionKind::AddHabit,
            Action::LogHabit { .. } => ActionKind::LogHabit,
            Action::RemoveHabit { .. } => ActionKind::RemoveHabit,
            Action::AddRoutine(_) => ActionKind::AddRoutine,
            Action::RemoveRoutine { .. } => ActionKind::RemoveRoutine,
            Action::SetDayType { .. } => ActionKind::SetDayType,
            Action::SetPreferences(_) => ActionKind::SetPreferences,
            Action::SetFocus(_) => ActionKind::SetFocus,
            Action::SelectItem(_) => ActionKind::SelectItem,
            Action::HealthLoading => ActionKind::HealthLoading,
            Action::HealthFetched { .. } => ActionKind::HealthFetched,
            Action::CalendarLoading => ActionKind::CalendarLoading,
            Action::CalendarFetched { .. } => ActionKind::CalendarFetched,
            Action::Hydrate(_) => ActionKind::Hydrate,
            Action::Reset => ActionKind::Reset,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_matches_variant() {
        let task = Task::new("a");
        let id = task.id;
        assert_eq!(Action::AddTask(task).kind(), ActionKind::AddTask);
        assert_eq!(Action::ToggleTask { id }.kind(), ActionKind::ToggleTask);
        assert_eq!(
            Action::Hydrate(DurablePartition::new()).kind(),
            ActionKind::Hydrate
        );
        assert_eq!(Action::Reset.kind(), ActionKind::Reset);
    }

    #[test]
    fn all_kinds_are_distinct() {
        let mut seen = std::collections::HashSet::new();
        for kind in ActionKind::ALL {
            assert!(seen.insert(kind), "{kind} listed twice");
        }
    }

    #[test]
    fn action_serializes_with_tag() {
        let json = serde_json::to_value(Action::SetFocus(View::Habits)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"type": "set_focus", "payload": "habits"})
        );
    }
}
