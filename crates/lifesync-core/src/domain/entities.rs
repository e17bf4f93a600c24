//! Entities stored in the state tree
//!
//! The sync core treats these as opaque serializable values; they exist so
//! the transition function has something concrete to edit. Constructors
//! that need a clock or randomness live here, never in the reducer.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::newtypes::ItemId;

// ============================================================================
// Tasks
// ============================================================================

/// A to-do item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: ItemId,
    pub title: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub due: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

impl Task {
    /// Creates an open task with a fresh id
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: ItemId::new(),
            title: title.into(),
            notes: String::new(),
            done: false,
            due: None,
            created_at: Utc::now(),
        }
    }

    /// Sets the due date
    pub fn with_due(mut self, due: NaiveDate) -> Self {
        self.due = Some(due);
        self
    }
}

/// Partial update of a [`Task`]; `None` fields are left untouched
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub notes: Option<String>,
    /// `Some(None)` clears the due date
    pub due: Option<Option<NaiveDate>>,
}

impl TaskPatch {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    /// Applies the patch to a task
    pub fn apply_to(&self, task: &mut Task) {
        if let Some(title) = &self.title {
            task.title = title.clone();
        }
        if let Some(notes) = &self.notes {
            task.notes = notes.clone();
        }
        if let Some(due) = self.due {
            task.due = due;
        }
    }
}

// ============================================================================
// Habits and routines
// ============================================================================

/// A habit with the set of days it was completed on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Habit {
    pub id: ItemId,
    pub name: String,
    #[serde(default)]
    pub completed_on: BTreeSet<NaiveDate>,
}

impl Habit {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: ItemId::new(),
            name: name.into(),
            completed_on: BTreeSet::new(),
        }
    }
}

/// An ordered list of steps applied on certain day types
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Routine {
    pub id: ItemId,
    pub name: String,
    #[serde(default)]
    pub steps: Vec<String>,
    /// Keys into [`Preferences::day_types`]
    #[serde(default)]
    pub day_types: Vec<String>,
}

impl Routine {
    pub fn new(name: impl Into<String>, steps: Vec<String>) -> Self {
        Self {
            id: ItemId::new(),
            name: name.into(),
            steps,
            day_types: Vec::new(),
        }
    }
}

// ============================================================================
// Preferences
// ============================================================================

/// First day of the week shown in planners
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeekStart {
    #[default]
    Monday,
    Sunday,
}

/// A user-defined kind of day ("workday", "rest", "travel")
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayType {
    pub label: String,
    #[serde(default)]
    pub color: String,
}

/// User preferences and day-type configuration
///
/// Hydrated field-by-field: a snapshot carrying only `theme` leaves the
/// other fields as they are.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default)]
    pub day_types: BTreeMap<String, DayType>,
    #[serde(default)]
    pub default_day_type: Option<String>,
    #[serde(default)]
    pub week_start: WeekStart,
    #[serde(default = "default_theme")]
    pub theme: String,
}

fn default_theme() -> String {
    "system".to_string()
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            day_types: BTreeMap::new(),
            default_day_type: None,
            week_start: WeekStart::default(),
            theme: default_theme(),
        }
    }
}

/// Partial update of [`Preferences`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreferencesPatch {
    pub default_day_type: Option<Option<String>>,
    pub week_start: Option<WeekStart>,
    pub theme: Option<String>,
}

impl PreferencesPatch {
    pub fn apply_to(&self, prefs: &mut Preferences) {
        if let Some(default_day_type) = &self.default_day_type {
            prefs.default_day_type = default_day_type.clone();
        }
        if let Some(week_start) = self.week_start {
            prefs.week_start = week_start;
        }
        if let Some(theme) = &self.theme {
            prefs.theme = theme.clone();
        }
    }
}

// ============================================================================
// Live caches (re-fetched, never persisted)
// ============================================================================

/// Health metrics last read from the fitness provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCache {
    /// True until the first fetch of this run completes
    pub loading: bool,
    pub steps: Option<u64>,
    pub sleep_minutes: Option<u32>,
    pub fetched_at: Option<DateTime<Utc>>,
}

impl Default for HealthCache {
    fn default() -> Self {
        Self {
            loading: true,
            steps: None,
            sleep_minutes: None,
            fetched_at: None,
        }
    }
}

/// A calendar entry read from the calendar provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub title: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

/// Calendar events last read from the calendar provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarCache {
    pub loading: bool,
    pub events: Vec<CalendarEvent>,
    pub fetched_at: Option<DateTime<Utc>>,
}

impl Default for CalendarCache {
    fn default() -> Self {
        Self {
            loading: true,
            events: Vec::new(),
            fetched_at: None,
        }
    }
}

// ============================================================================
// UI
// ============================================================================

/// Top-level view currently focused
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum View {
    #[default]
    Today,
    Tasks,
    Habits,
    Routines,
    Calendar,
    Settings,
}

/// UI-only state; never persisted and never touched by hydration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UiState {
    pub focus: View,
    pub selected: Option<ItemId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_patch_updates_only_given_fields() {
        let mut task = Task::new("Write report");
        task.notes = "draft".to_string();
        let due = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();

        TaskPatch {
            title: Some("Write final report".to_string()),
            notes: None,
            due: Some(Some(due)),
        }
        .apply_to(&mut task);

        assert_eq!(task.title, "Write final report");
        assert_eq!(task.notes, "draft");
        assert_eq!(task.due, Some(due));

        TaskPatch {
            due: Some(None),
            ..TaskPatch::default()
        }
        .apply_to(&mut task);
        assert_eq!(task.due, None);
    }

    #[test]
    fn caches_default_to_loading() {
        assert!(HealthCache::default().loading);
        assert!(CalendarCache::default().loading);
    }

    #[test]
    fn preferences_deserialize_with_missing_fields() {
        let prefs: Preferences = serde_json::from_str("{\"week_start\":\"sunday\"}").unwrap();
        assert_eq!(prefs.week_start, WeekStart::Sunday);
        assert_eq!(prefs.theme, "system");
        assert!(prefs.day_types.is_empty());
    }
}
