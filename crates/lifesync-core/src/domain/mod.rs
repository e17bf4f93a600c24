//! Domain entities and business logic
//!
//! This module contains the core domain types for LifeSync:
//! - Newtypes for identities, sessions, items and versions
//! - The entities stored in the state tree (tasks, habits, routines, ...)
//! - The state tree, its domains and their persistence policy table
//! - The closed action set
//! - Durable partitions and versioned snapshots
//! - Domain-specific error types

pub mod action;
pub mod entities;
pub mod errors;
pub mod newtypes;
pub mod snapshot;
pub mod state;

// Re-export commonly used types
pub use action::{Action, ActionKind};
pub use entities::{
    CalendarCache, CalendarEvent, DayType, Habit, HealthCache, Preferences, PreferencesPatch,
    Routine, Task, TaskPatch, UiState, View, WeekStart,
};
pub use errors::DomainError;
pub use newtypes::*;
pub use snapshot::{DurablePartition, Snapshot};
pub use state::{validate_policy_table, Domain, DomainPolicy, StateTree, DOMAIN_POLICIES};
