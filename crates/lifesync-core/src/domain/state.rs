//! The state tree and its per-domain persistence policies
//!
//! The tree is partitioned into named [`Domain`]s. How each domain takes
//! part in persistence and hydration is declared once, in
//! [`DOMAIN_POLICIES`], and checked at startup by
//! [`validate_policy_table`]. Adding a domain without a policy entry makes
//! the container refuse to start instead of silently picking a rule.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::entities::{CalendarCache, Habit, HealthCache, Preferences, Routine, Task, UiState};
use super::errors::DomainError;

// ============================================================================
// Domain
// ============================================================================

/// A named partition of the state tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Tasks,
    Habits,
    Routines,
    Preferences,
    Health,
    Calendar,
    Ui,
}

impl Domain {
    /// Every domain, in tree order
    pub const ALL: [Domain; 7] = [
        Domain::Tasks,
        Domain::Habits,
        Domain::Routines,
        Domain::Preferences,
        Domain::Health,
        Domain::Calendar,
        Domain::Ui,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Tasks => "tasks",
            Domain::Habits => "habits",
            Domain::Routines => "routines",
            Domain::Preferences => "preferences",
            Domain::Health => "health",
            Domain::Calendar => "calendar",
            Domain::Ui => "ui",
        }
    }

    /// The policy declared for this domain in [`DOMAIN_POLICIES`]
    ///
    /// Falls back to [`DomainPolicy::NeverPersisted`] for a domain missing
    /// from the table; [`validate_policy_table`] rejects such a table at
    /// startup, so the fallback only matters in a misconfigured build.
    pub fn policy(&self) -> DomainPolicy {
        DOMAIN_POLICIES
            .iter()
            .find(|(domain, _)| domain == self)
            .map(|(_, policy)| *policy)
            .unwrap_or(DomainPolicy::NeverPersisted)
    }

    /// Domains whose content is written to local and remote storage
    pub fn persisted() -> impl Iterator<Item = Domain> {
        Domain::ALL
            .into_iter()
            .filter(|domain| domain.policy().is_persisted())
    }
}

impl Display for Domain {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Domain {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Domain::ALL
            .into_iter()
            .find(|domain| domain.as_str() == s)
            .ok_or_else(|| DomainError::UnknownDomain(s.to_string()))
    }
}

// ============================================================================
// DomainPolicy
// ============================================================================

/// How a domain is persisted and hydrated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DomainPolicy {
    /// Persisted and synced; hydration replaces the domain wholesale
    /// (with the default when the snapshot does not carry it)
    Replace,
    /// Persisted and synced; hydration shallow-merges incoming fields over
    /// the current ones
    Merge,
    /// Never persisted; hydration always recomputes the default, whatever
    /// the snapshot holds
    NeverPersisted,
    /// UI-only; never persisted and never touched by hydration
    UiOnly,
}

impl DomainPolicy {
    /// Returns true if domains with this policy are written to storage
    pub fn is_persisted(&self) -> bool {
        matches!(self, DomainPolicy::Replace | DomainPolicy::Merge)
    }
}

/// Persistence policy of every domain
pub const DOMAIN_POLICIES: &[(Domain, DomainPolicy)] = &[
    (Domain::Tasks, DomainPolicy::Replace),
    (Domain::Habits, DomainPolicy::Replace),
    (Domain::Routines, DomainPolicy::Replace),
    (Domain::Preferences, DomainPolicy::Merge),
    (Domain::Health, DomainPolicy::NeverPersisted),
    (Domain::Calendar, DomainPolicy::NeverPersisted),
    (Domain::Ui, DomainPolicy::UiOnly),
];

/// Checks that every domain appears exactly once in `table`
///
/// # Errors
/// Returns [`DomainError::PolicyTable`] naming the first missing or
/// duplicated domain
pub fn validate_policy_table(table: &[(Domain, DomainPolicy)]) -> Result<(), DomainError> {
    for domain in Domain::ALL {
        let count = table.iter().filter(|(d, _)| *d == domain).count();
        match count {
            1 => {}
            0 => {
                return Err(DomainError::PolicyTable(format!(
                    "no policy declared for domain '{domain}'"
                )))
            }
            n => {
                return Err(DomainError::PolicyTable(format!(
                    "domain '{domain}' declared {n} times"
                )))
            }
        }
    }

    if let Some((domain, _)) = table
        .iter()
        .find(|(d, p)| *d == Domain::Ui && *p != DomainPolicy::UiOnly)
    {
        return Err(DomainError::PolicyTable(format!(
            "domain '{domain}' must be ui_only"
        )));
    }

    Ok(())
}

// ============================================================================
// StateTree
// ============================================================================

/// The single in-memory document held by the state container
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateTree {
    pub tasks: Vec<Task>,
    pub habits: Vec<Habit>,
    pub routines: Vec<Routine>,
    pub preferences: Preferences,
    pub health: HealthCache,
    pub calendar: CalendarCache,
    pub ui: UiState,
}

impl StateTree {
    /// Serializes one domain to a JSON value
    pub fn domain_value(&self, domain: Domain) -> Result<Value, serde_json::Error> {
        match domain {
            Domain::Tasks => serde_json::to_value(&self.tasks),
            Domain::Habits => serde_json::to_value(&self.habits),
            Domain::Routines => serde_json::to_value(&self.routines),
            Domain::Preferences => serde_json::to_value(&self.preferences),
            Domain::Health => serde_json::to_value(&self.health),
            Domain::Calendar => serde_json::to_value(&self.calendar),
            Domain::Ui => serde_json::to_value(&self.ui),
        }
    }

    /// Replaces one domain with a decoded JSON value
    ///
    /// On a decode error the domain is left unchanged.
    pub fn replace_domain(&mut self, domain: Domain, value: Value) -> Result<(), serde_json::Error> {
        match domain {
            Domain::Tasks => self.tasks = serde_json::from_value(value)?,
            Domain::Habits => self.habits = serde_json::from_value(value)?,
            Domain::Routines => self.routines = serde_json::from_value(value)?,
            Domain::Preferences => self.preferences = serde_json::from_value(value)?,
            Domain::Health => self.health = serde_json::from_value(value)?,
            Domain::Calendar => self.calendar = serde_json::from_value(value)?,
            Domain::Ui => self.ui = serde_json::from_value(value)?,
        }
        Ok(())
    }

    /// Resets one domain to its default
    pub fn reset_domain(&mut self, domain: Domain) {
        let defaults = StateTree::default();
        match domain {
            Domain::Tasks => self.tasks = defaults.tasks,
            Domain::Habits => self.habits = defaults.habits,
            Domain::Routines => self.routines = defaults.routines,
            Domain::Preferences => self.preferences = defaults.preferences,
            Domain::Health => self.health = defaults.health,
            Domain::Calendar => self.calendar = defaults.calendar,
            Domain::Ui => self.ui = defaults.ui,
        }
    }
}
