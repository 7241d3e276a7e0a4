//! Task domain model.
//!
//! # Responsibility
//! - Define the single task record shared by store, services and scheduler.
//! - Validate caller input before it reaches persistence.
//!
//! # Invariants
//! - `id` is assigned by the store and never reused.
//! - `kind` is fixed at creation; no API changes it afterwards.
//! - `text` is never empty after trimming.
//! - A recurring task's `scheduled_date` is its creation date, not "today".

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier for one task row.
pub type TaskId = Uuid;

/// Task recurrence category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    /// One-off task bound to a single calendar date.
    Regular,
    /// Task that comes back every day until deleted.
    Recurring,
}

impl TaskKind {
    /// Stable storage/string form.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Regular => "regular",
            Self::Recurring => "recurring",
        }
    }

    /// Parses the storage/string form produced by [`TaskKind::as_str`].
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "regular" => Some(Self::Regular),
            "recurring" => Some(Self::Recurring),
            _ => None,
        }
    }
}

impl Display for TaskKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted task record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub text: String,
    /// Serialized as `type` to match the router payload naming.
    #[serde(rename = "type")]
    pub kind: TaskKind,
    pub completed: bool,
    pub scheduled_date: NaiveDate,
    /// Unix epoch milliseconds. Only used for default ordering.
    pub created_at: i64,
}

impl Task {
    /// Returns whether the daily reset and the completion hook apply.
    pub fn is_recurring(&self) -> bool {
        match self.kind {
            TaskKind::Recurring => true,
            TaskKind::Regular => false,
        }
    }
}

/// Validated input for one new task row.
///
/// The store assigns `id` and `created_at`; `completed` always starts false.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDraft {
    pub text: String,
    pub kind: TaskKind,
    pub scheduled_date: NaiveDate,
}

impl TaskDraft {
    /// Builds a draft, trimming `text` and rejecting blank labels.
    pub fn new(
        text: impl AsRef<str>,
        kind: TaskKind,
        scheduled_date: NaiveDate,
    ) -> Result<Self, TaskValidationError> {
        let draft = Self {
            text: text.as_ref().trim().to_string(),
            kind,
            scheduled_date,
        };
        draft.validate()?;
        Ok(draft)
    }

    /// Checks draft invariants.
    pub fn validate(&self) -> Result<(), TaskValidationError> {
        if self.text.trim().is_empty() {
            return Err(TaskValidationError::EmptyText);
        }
        Ok(())
    }
}

/// Input validation failures for task writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskValidationError {
    /// Task label is empty or whitespace only.
    EmptyText,
}

impl Display for TaskValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyText => write!(f, "task text must not be empty"),
        }
    }
}

impl Error for TaskValidationError {}
