//! Recurrence rules for daily tasks.
//!
//! # Responsibility
//! - Spawn a fresh incomplete copy when a recurring task is completed.
//! - Clear the completion flag of every recurring task at the daily boundary.
//!
//! # Invariants
//! - Both mechanisms stay active; rows are never deduplicated or deleted.
//! - A spawned copy keeps `text` and `kind`, starts incomplete and is dated
//!   on the day it was spawned.
//! - Regular tasks are never touched.

use crate::model::task::{Task, TaskDraft, TaskKind};
use crate::repo::task_repo::{RepoResult, TaskRepository};
use chrono::NaiveDate;
use log::{error, info};

/// Creates the next occurrence of a just-completed recurring task.
///
/// Returns `Ok(None)` for regular tasks. Callers invoke this only after the
/// completion flip has been persisted.
pub fn spawn_next_occurrence<R: TaskRepository + ?Sized>(
    repo: &R,
    completed: &Task,
    today: NaiveDate,
) -> RepoResult<Option<Task>> {
    match completed.kind {
        TaskKind::Regular => Ok(None),
        TaskKind::Recurring => {
            let draft = TaskDraft::new(&completed.text, TaskKind::Recurring, today)?;
            let spawned = repo.create_task(&draft)?;
            info!(
                "event=recurrence_spawn module=recurrence status=ok source_id={} spawned_id={}",
                completed.id, spawned.id
            );
            Ok(Some(spawned))
        }
    }
}

/// Marks every recurring task incomplete, whatever its current state.
///
/// Returns the number of rows touched.
pub fn reset_all_recurring<R: TaskRepository + ?Sized>(repo: &R) -> RepoResult<usize> {
    match repo.reset_completed(TaskKind::Recurring) {
        Ok(rows) => {
            info!("event=recurrence_reset module=recurrence status=ok rows={rows}");
            Ok(rows)
        }
        Err(err) => {
            error!(
                "event=recurrence_reset module=recurrence status=error error_code=reset_failed error={err}"
            );
            Err(err)
        }
    }
}
