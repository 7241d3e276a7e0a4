//! Task use-case service.
//!
//! # Responsibility
//! - Provide the add/toggle/delete/query entry points used by routers.
//! - Run the recurrence completion hook after a recurring task is completed.
//!
//! # Invariants
//! - The completion flip is persisted before the next occurrence is spawned.
//! - A failed spawn never fails the toggle that triggered it.
//! - Missing dates default to the clock's current local date.

use crate::clock::Clock;
use crate::model::task::{Task, TaskDraft, TaskId, TaskKind, TaskValidationError};
use crate::repo::task_repo::{RepoError, TaskListQuery, TaskRepository};
use crate::service::recurrence::spawn_next_occurrence;
use chrono::NaiveDate;
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Errors from task use-cases.
#[derive(Debug)]
pub enum TaskServiceError {
    /// Caller input rejected before touching the store.
    Validation(TaskValidationError),
    /// Target task does not exist.
    NotFound(TaskId),
    /// Persistence-layer failure.
    Store(RepoError),
}

impl Display for TaskServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "task not found: {id}"),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for TaskServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::NotFound(_) => None,
            Self::Store(err) => Some(err),
        }
    }
}

impl From<TaskValidationError> for TaskServiceError {
    fn from(value: TaskValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for TaskServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::NotFound(id),
            RepoError::Validation(err) => Self::Validation(err),
            other => Self::Store(other),
        }
    }
}

/// What happened after a successful completion toggle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionOutcome {
    /// Flag written; no recurrence follow-up applies.
    Updated,
    /// Flag written and the next occurrence of a recurring task was created.
    SpawnedNext(Task),
    /// Flag written but creating the next occurrence failed (logged).
    SpawnFailed,
}

/// Task service facade over a repository and a clock.
pub struct TaskService<R: TaskRepository, C: Clock> {
    repo: R,
    clock: C,
}

impl<R: TaskRepository, C: Clock> TaskService<R, C> {
    /// Creates a service using the provided repository and clock.
    pub fn new(repo: R, clock: C) -> Self {
        Self { repo, clock }
    }

    /// Creates one task.
    ///
    /// # Contract
    /// - `text` is trimmed; blank text fails with `Validation`.
    /// - `date = None` schedules the task on today's local date.
    /// - The returned task is incomplete and carries its store-assigned id.
    pub fn add_task(
        &self,
        text: impl AsRef<str>,
        kind: TaskKind,
        date: Option<NaiveDate>,
    ) -> Result<Task, TaskServiceError> {
        let scheduled_date = date.unwrap_or_else(|| self.clock.today());
        let draft = TaskDraft::new(text, kind, scheduled_date)?;
        let task = self.repo.create_task(&draft)?;
        info!(
            "event=task_add module=service status=ok id={} kind={} date={}",
            task.id, task.kind, task.scheduled_date
        );
        Ok(task)
    }

    /// Sets the completion flag of one task.
    ///
    /// Completing a recurring task also spawns its next occurrence. Only the
    /// primary write can fail the call; a spawn failure is reported as
    /// [`CompletionOutcome::SpawnFailed`].
    pub fn set_completed(
        &self,
        id: TaskId,
        completed: bool,
    ) -> Result<CompletionOutcome, TaskServiceError> {
        let task = self
            .repo
            .get_task(id)?
            .ok_or(TaskServiceError::NotFound(id))?;

        self.repo.set_completed(id, completed)?;
        info!(
            "event=task_set_completed module=service status=ok id={id} kind={} completed={completed}",
            task.kind
        );

        if !completed {
            return Ok(CompletionOutcome::Updated);
        }

        match spawn_next_occurrence(&self.repo, &task, self.clock.today()) {
            Ok(Some(next)) => Ok(CompletionOutcome::SpawnedNext(next)),
            Ok(None) => Ok(CompletionOutcome::Updated),
            Err(err) => {
                warn!(
                    "event=recurrence_spawn module=service status=error source_id={id} error_code=spawn_failed error={err}"
                );
                Ok(CompletionOutcome::SpawnFailed)
            }
        }
    }

    /// Deletes one task permanently.
    pub fn delete_task(&self, id: TaskId) -> Result<(), TaskServiceError> {
        self.repo.delete_task(id)?;
        info!("event=task_delete module=service status=ok id={id}");
        Ok(())
    }

    /// Gets one task by id.
    pub fn get_task(&self, id: TaskId) -> Result<Option<Task>, TaskServiceError> {
        Ok(self.repo.get_task(id)?)
    }

    /// Lists every task, newest first.
    pub fn list_tasks(&self) -> Result<Vec<Task>, TaskServiceError> {
        Ok(self.repo.list_tasks(&TaskListQuery::default())?)
    }

    /// Lists tasks scheduled on `date`, newest first.
    pub fn tasks_on_date(&self, date: NaiveDate) -> Result<Vec<Task>, TaskServiceError> {
        Ok(self.repo.list_tasks(&TaskListQuery::on_date(date))?)
    }

    /// Lists tasks scheduled within `[start, end]`, newest first.
    ///
    /// An inverted range yields no tasks.
    pub fn tasks_in_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Task>, TaskServiceError> {
        Ok(self.repo.list_tasks(&TaskListQuery::in_range(start, end))?)
    }
}
