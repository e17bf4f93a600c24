//! The transition function
//!
//! [`reduce`] maps `(state, action)` to the next state. It is pure: no
//! clock, no randomness, no I/O, no logging. Everything an action needs
//! (ids, timestamps) travels in its payload.

use serde_json::Value;

use crate::domain::{
    Action, Domain, DomainPolicy, DurablePartition, StateTree, DOMAIN_POLICIES,
};

/// Computes the state that follows `state` after `action`
///
/// Edits addressing an id that does not exist leave the tree unchanged.
pub fn reduce(state: &StateTree, action: &Action) -> StateTree {
    let mut next = state.clone();
    apply(&mut next, action);
    next
}

fn apply(tree: &mut StateTree, action: &Action) {
    match action {
        Action::AddTask(task) => {
            if !tree.tasks.iter().any(|t| t.id == task.id) {
                tree.tasks.push(task.clone());
            }
        }
        Action::UpdateTask { id, patch } => {
            if let Some(task) = tree.tasks.iter_mut().find(|t| t.id == *id) {
                patch.apply_to(task);
            }
        }
        Action::ToggleTask { id } => {
            if let Some(task) = tree.tasks.iter_mut().find(|t| t.id == *id) {
                task.done = !task.done;
            }
        }
        Action::RemoveTask { id } => tree.tasks.retain(|t| t.id != *id),

        Action::AddHabit(habit) => {
            if !tree.habits.iter().any(|h| h.id == habit.id) {
                tree.habits.push(habit.clone());
            }
        }
        Action::LogHabit { id, date } => {
            if let Some(habit) = tree.habits.iter_mut().find(|h| h.id == *id) {
                if !habit.completed_on.remove(date) {
                    habit.completed_on.insert(*date);
                }
            }
        }
        Action::RemoveHabit { id } => tree.habits.retain(|h| h.id != *id),

        Action::AddRoutine(routine) => {
            if !tree.routines.iter().any(|r| r.id == routine.id) {
                tree.routines.push(routine.clone());
            }
        }
        Action::RemoveRoutine { id } => tree.routines.retain(|r| r.id != *id),

        Action::SetDayType { key, day_type } => match day_type {
            Some(day_type) => {
                tree.preferences
                    .day_types
                    .insert(key.clone(), day_type.clone());
            }
            None => {
                tree.preferences.day_types.remove(key);
                if tree.preferences.default_day_type.as_deref() == Some(key.as_str()) {
                    tree.preferences.default_day_type = None;
                }
            }
        },
        Action::SetPreferences(patch) => patch.apply_to(&mut tree.preferences),

        Action::SetFocus(view) => tree.ui.focus = *view,
        Action::SelectItem(selected) => tree.ui.selected = *selected,

        Action::HealthLoading => tree.health.loading = true,
        Action::HealthFetched {
            steps,
            sleep_minutes,
            fetched_at,
        } => {
            tree.health.loading = false;
            tree.health.steps = *steps;
            tree.health.sleep_minutes = *sleep_minutes;
            tree.health.fetched_at = Some(*fetched_at);
        }
        Action::CalendarLoading => tree.calendar.loading = true,
        Action::CalendarFetched { events, fetched_at } => {
            tree.calendar.loading = false;
            tree.calendar.events = events.clone();
            tree.calendar.fetched_at = Some(*fetched_at);
        }

        Action::Hydrate(incoming) => hydrate(tree, incoming),
        Action::Reset => *tree = StateTree::default(),
    }
}

/// Merges `incoming` into `tree` following [`DOMAIN_POLICIES`]
///
/// A domain whose incoming value fails to decode keeps its current value.
fn hydrate(tree: &mut StateTree, incoming: &DurablePartition) {
    for &(domain, policy) in DOMAIN_POLICIES {
        match policy {
            DomainPolicy::UiOnly => {}
            DomainPolicy::NeverPersisted => tree.reset_domain(domain),
            DomainPolicy::Replace => match incoming.get(domain) {
                Some(value) => {
                    let _ = tree.replace_domain(domain, value.clone());
                }
                None => tree.reset_domain(domain),
            },
            DomainPolicy::Merge => {
                if let Some(Value::Object(fields)) = incoming.get(domain) {
                    merge_fields(tree, domain, fields);
                }
            }
        }
    }
}

/// Shallow merge: each incoming top-level field overwrites the current one
fn merge_fields(tree: &mut StateTree, domain: Domain, fields: &serde_json::Map<String, Value>) {
    let Ok(Value::Object(mut current)) = tree.domain_value(domain) else {
        return;
    };
    for (key, value) in fields {
        current.insert(key.clone(), value.clone());
    }
    let _ = tree.replace_domain(domain, Value::Object(current));
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};
    use serde_json::json;

    use super::*;
    use crate::domain::{
        DayType, Habit, ItemId, PreferencesPatch, Task, TaskPatch, View, WeekStart,
    };

    fn tree_with_task(title: &str) -> (StateTree, ItemId) {
        let task = Task::new(title);
        let id = task.id;
        (reduce(&StateTree::default(), &Action::AddTask(task)), id)
    }

    #[test]
    fn reduce_does_not_mutate_input() {
        let before = StateTree::default();
        let after = reduce(&before, &Action::AddTask(Task::new("a")));
        assert!(before.tasks.is_empty());
        assert_eq!(after.tasks.len(), 1);
    }

    #[test]
    fn reduce_is_deterministic() {
        let (tree, id) = tree_with_task("a");
        let action = Action::UpdateTask {
            id,
            patch: TaskPatch::title("b"),
        };
        assert_eq!(reduce(&tree, &action), reduce(&tree, &action));
    }

    #[test]
    fn task_lifecycle() {
        let (tree, id) = tree_with_task("Buy milk");

        let tree = reduce(
            &tree,
            &Action::UpdateTask {
                id,
                patch: TaskPatch::title("Buy oat milk"),
            },
        );
        assert_eq!(tree.tasks[0].title, "Buy oat milk");

        let tree = reduce(&tree, &Action::ToggleTask { id });
        assert!(tree.tasks[0].done);

        let tree = reduce(&tree, &Action::RemoveTask { id });
        assert!(tree.tasks.is_empty());
    }

    #[test]
    fn add_task_with_existing_id_is_ignored() {
        let task = Task::new("a");
        let tree = reduce(&StateTree::default(), &Action::AddTask(task.clone()));
        let tree = reduce(&tree, &Action::AddTask(task));
        assert_eq!(tree.tasks.len(), 1);
    }

    #[test]
    fn edits_on_unknown_ids_are_noops() {
        let (tree, _) = tree_with_task("a");
        let other = ItemId::new();
        assert_eq!(reduce(&tree, &Action::ToggleTask { id: other }), tree);
        assert_eq!(reduce(&tree, &Action::RemoveHabit { id: other }), tree);
    }

    #[test]
    fn log_habit_toggles_date() {
        let habit = Habit::new("Stretch");
        let id = habit.id;
        let date = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();

        let tree = reduce(&StateTree::default(), &Action::AddHabit(habit));
        let tree = reduce(&tree, &Action::LogHabit { id, date });
        assert!(tree.habits[0].completed_on.contains(&date));

        let tree = reduce(&tree, &Action::LogHabit { id, date });
        assert!(tree.habits[0].completed_on.is_empty());
    }

    #[test]
    fn removing_default_day_type_clears_default() {
        let tree = reduce(
            &StateTree::default(),
            &Action::SetDayType {
                key: "work".to_string(),
                day_type: Some(DayType {
                    label: "Workday".to_string(),
                    color: "#336699".to_string(),
                }),
            },
        );
        let tree = reduce(
            &tree,
            &Action::SetPreferences(PreferencesPatch {
                default_day_type: Some(Some("work".to_string())),
                ..PreferencesPatch::default()
            }),
        );
        assert_eq!(tree.preferences.default_day_type.as_deref(), Some("work"));

        let tree = reduce(
            &tree,
            &Action::SetDayType {
                key: "work".to_string(),
                day_type: None,
            },
        );
        assert!(tree.preferences.day_types.is_empty());
        assert_eq!(tree.preferences.default_day_type, None);
    }

    #[test]
    fn fetched_data_clears_loading_flag() {
        let now = Utc::now();
        let tree = reduce(
            &StateTree::default(),
            &Action::HealthFetched {
                steps: Some(4000),
                sleep_minutes: Some(420),
                fetched_at: now,
            },
        );
        assert!(!tree.health.loading);
        assert_eq!(tree.health.steps, Some(4000));
    }

    #[test]
    fn hydrate_replaces_list_domains_wholesale() {
        let (tree, _) = tree_with_task("local");
        let remote_task = Task::new("remote");
        let incoming = DurablePartition::new()
            .with_domain(Domain::Tasks, serde_json::to_value(vec![remote_task.clone()]).unwrap());

        let tree = reduce(&tree, &Action::Hydrate(incoming));

        assert_eq!(tree.tasks, vec![remote_task]);
    }

    #[test]
    fn hydrate_defaults_absent_replace_domains() {
        let habit = Habit::new("Read");
        let tree = reduce(&StateTree::default(), &Action::AddHabit(habit));

        let tree = reduce(&tree, &Action::Hydrate(DurablePartition::new()));

        assert!(tree.habits.is_empty());
    }

    #[test]
    fn hydrate_merges_preferences_fields() {
        let tree = reduce(
            &StateTree::default(),
            &Action::SetPreferences(PreferencesPatch {
                theme: Some("dark".to_string()),
                ..PreferencesPatch::default()
            }),
        );
        let incoming = DurablePartition::new()
            .with_domain(Domain::Preferences, json!({"week_start": "sunday"}));

        let tree = reduce(&tree, &Action::Hydrate(incoming));

        assert_eq!(tree.preferences.week_start, WeekStart::Sunday);
        assert_eq!(tree.preferences.theme, "dark");
    }

    #[test]
    fn hydrate_absent_merge_domain_keeps_current() {
        let tree = reduce(
            &StateTree::default(),
            &Action::SetPreferences(PreferencesPatch {
                theme: Some("dark".to_string()),
                ..PreferencesPatch::default()
            }),
        );
        let tree = reduce(&tree, &Action::Hydrate(DurablePartition::new()));
        assert_eq!(tree.preferences.theme, "dark");
    }

    #[test]
    fn hydrate_resets_never_persisted_domains_even_if_present() {
        let tree = reduce(
            &StateTree::default(),
            &Action::HealthFetched {
                steps: Some(9000),
                sleep_minutes: None,
                fetched_at: Utc::now(),
            },
        );
        let incoming = DurablePartition::new().with_domain(
            Domain::Health,
            json!({"loading": false, "steps": 1, "sleep_minutes": null, "fetched_at": null}),
        );

        let tree = reduce(&tree, &Action::Hydrate(incoming));

        assert!(tree.health.loading);
        assert_eq!(tree.health.steps, None);
    }

    #[test]
    fn hydrate_never_touches_ui() {
        let tree = reduce(&StateTree::default(), &Action::SetFocus(View::Calendar));
        let incoming = DurablePartition::new().with_domain(Domain::Ui, json!({"focus": "settings"}));

        let tree = reduce(&tree, &Action::Hydrate(incoming));

        assert_eq!(tree.ui.focus, View::Calendar);
    }

    #[test]
    fn hydrate_keeps_domain_on_malformed_value() {
        let (tree, _) = tree_with_task("keep");
        let incoming = DurablePartition::new().with_domain(Domain::Tasks, json!("garbage"));

        let tree = reduce(&tree, &Action::Hydrate(incoming));

        assert_eq!(tree.tasks.len(), 1);
    }

    #[test]
    fn reset_restores_defaults_everywhere() {
        let (tree, _) = tree_with_task("a");
        let tree = reduce(&tree, &Action::SetFocus(View::Tasks));
        assert_eq!(reduce(&tree, &Action::Reset), StateTree::default());
    }
}
