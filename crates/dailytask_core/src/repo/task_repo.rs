//! Task repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide the task store capability: create, toggle, delete, filtered
//!   listing, bulk reset and grouped bucket counts.
//! - Keep SQL details inside the persistence boundary.
//!
//! # Invariants
//! - Write paths validate drafts before SQL mutations.
//! - Read paths reject invalid persisted state instead of masking it.
//! - One connection is shared by all clones; the mutex serializes writes.

use crate::db::DbError;
use crate::model::task::{Task, TaskDraft, TaskId, TaskKind, TaskValidationError};
use chrono::{NaiveDate, Utc};
use log::debug;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

const TASK_SELECT_SQL: &str = "SELECT
    id,
    text,
    kind,
    completed,
    scheduled_date,
    created_at
FROM tasks";

const DATE_FORMAT: &str = "%Y-%m-%d";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for task persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(TaskValidationError),
    Db(DbError),
    NotFound(TaskId),
    InvalidData(String),
    /// A previous holder of the shared connection panicked mid-operation.
    LockPoisoned,
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "task not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted task data: {message}"),
            Self::LockPoisoned => write!(f, "task store connection lock poisoned"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::NotFound(_) | Self::InvalidData(_) | Self::LockPoisoned => None,
        }
    }
}

impl From<TaskValidationError> for RepoError {
    fn from(value: TaskValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Filter options for listing tasks.
///
/// Date bounds are inclusive. Results are ordered newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskListQuery {
    pub kind: Option<TaskKind>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

impl TaskListQuery {
    /// Tasks scheduled exactly on `date`.
    pub fn on_date(date: NaiveDate) -> Self {
        Self::in_range(date, date)
    }

    /// Tasks scheduled within `[start, end]`.
    pub fn in_range(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            kind: None,
            date_from: Some(start),
            date_to: Some(end),
        }
    }

    /// Every task of one kind regardless of date.
    pub fn of_kind(kind: TaskKind) -> Self {
        Self {
            kind: Some(kind),
            ..Self::default()
        }
    }
}

/// Granularity of a grouped count query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketUnit {
    Day,
    Month,
}

/// Structured bucket identity used to match rows to statistics slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BucketKey {
    Day(NaiveDate),
    Month { year: i32, month: u32 },
}

/// One row of a grouped count query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BucketCount {
    pub key: BucketKey,
    pub total: u32,
    pub completed: u32,
}

/// Task store capability consumed by services and the scheduler.
pub trait TaskRepository {
    /// Inserts a new incomplete task and returns the stored row.
    fn create_task(&self, draft: &TaskDraft) -> RepoResult<Task>;
    fn get_task(&self, id: TaskId) -> RepoResult<Option<Task>>;
    /// Returns `NotFound` when no row matches `id`.
    fn set_completed(&self, id: TaskId, completed: bool) -> RepoResult<()>;
    /// Returns `NotFound` when no row matches `id`.
    fn delete_task(&self, id: TaskId) -> RepoResult<()>;
    fn list_tasks(&self, query: &TaskListQuery) -> RepoResult<Vec<Task>>;
    /// Sets `completed = false` on every task of `kind`; returns rows touched.
    fn reset_completed(&self, kind: TaskKind) -> RepoResult<usize>;
    /// Counts tasks per bucket for `scheduled_date` within `[start, end]`.
    ///
    /// Buckets without tasks are absent from the result.
    fn bucket_counts(
        &self,
        unit: BucketUnit,
        start: NaiveDate,
        end: NaiveDate,
    ) -> RepoResult<Vec<BucketCount>>;
}

/// SQLite-backed task repository.
///
/// Cheap to clone; clones share one connection.
#[derive(Clone)]
pub struct SqliteTaskRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteTaskRepository {
    /// Wraps a migrated connection (see [`crate::db::open_db`]).
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    fn conn(&self) -> RepoResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| RepoError::LockPoisoned)
    }
}

impl TaskRepository for SqliteTaskRepository {
    fn create_task(&self, draft: &TaskDraft) -> RepoResult<Task> {
        draft.validate()?;

        let task = Task {
            id: Uuid::new_v4(),
            text: draft.text.clone(),
            kind: draft.kind,
            completed: false,
            scheduled_date: draft.scheduled_date,
            created_at: Utc::now().timestamp_millis(),
        };

        self.conn()?.execute(
            "INSERT INTO tasks (
                id,
                text,
                kind,
                completed,
                scheduled_date,
                created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                task.id.to_string(),
                task.text.as_str(),
                task.kind.as_str(),
                bool_to_int(task.completed),
                date_to_db(task.scheduled_date),
                task.created_at,
            ],
        )?;

        debug!(
            "event=task_insert module=repo status=ok id={} kind={} date={}",
            task.id, task.kind, task.scheduled_date
        );
        Ok(task)
    }

    fn get_task(&self, id: TaskId) -> RepoResult<Option<Task>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!("{TASK_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_task_row(row)?));
        }

        Ok(None)
    }

    fn set_completed(&self, id: TaskId, completed: bool) -> RepoResult<()> {
        let changed = self.conn()?.execute(
            "UPDATE tasks SET completed = ?1 WHERE id = ?2;",
            params![bool_to_int(completed), id.to_string()],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }

        debug!("event=task_update module=repo status=ok id={id} completed={completed}");
        Ok(())
    }

    fn delete_task(&self, id: TaskId) -> RepoResult<()> {
        let changed = self
            .conn()?
            .execute("DELETE FROM tasks WHERE id = ?1;", [id.to_string()])?;

        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }

        debug!("event=task_delete module=repo status=ok id={id}");
        Ok(())
    }

    fn list_tasks(&self, query: &TaskListQuery) -> RepoResult<Vec<Task>> {
        let mut sql = format!("{TASK_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(kind) = query.kind {
            sql.push_str(" AND kind = ?");
            bind_values.push(Value::Text(kind.as_str().to_string()));
        }
        if let Some(from) = query.date_from {
            sql.push_str(" AND scheduled_date >= ?");
            bind_values.push(Value::Text(date_to_db(from)));
        }
        if let Some(to) = query.date_to {
            sql.push_str(" AND scheduled_date <= ?");
            bind_values.push(Value::Text(date_to_db(to)));
        }

        sql.push_str(" ORDER BY created_at DESC, rowid DESC");

        let conn = self.conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut tasks = Vec::new();

        while let Some(row) = rows.next()? {
            tasks.push(parse_task_row(row)?);
        }

        Ok(tasks)
    }

    fn reset_completed(&self, kind: TaskKind) -> RepoResult<usize> {
        let changed = self
            .conn()?
            .execute("UPDATE tasks SET completed = 0 WHERE kind = ?1;", [kind.as_str()])?;

        debug!("event=task_reset module=repo status=ok kind={kind} rows={changed}");
        Ok(changed)
    }

    fn bucket_counts(
        &self,
        unit: BucketUnit,
        start: NaiveDate,
        end: NaiveDate,
    ) -> RepoResult<Vec<BucketCount>> {
        let bucket_expr = match unit {
            BucketUnit::Day => "scheduled_date",
            BucketUnit::Month => "strftime('%Y-%m', scheduled_date)",
        };
        let sql = format!(
            "SELECT
                {bucket_expr} AS bucket,
                COUNT(*) AS total,
                COALESCE(SUM(completed), 0) AS completed
             FROM tasks
             WHERE scheduled_date BETWEEN ?1 AND ?2
             GROUP BY bucket
             ORDER BY bucket;"
        );

        let conn = self.conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(params![date_to_db(start), date_to_db(end)])?;
        let mut counts = Vec::new();

        while let Some(row) = rows.next()? {
            let bucket: String = row.get("bucket")?;
            counts.push(BucketCount {
                key: parse_bucket_key(unit, &bucket)?,
                total: count_from_db(row.get("total")?, "total")?,
                completed: count_from_db(row.get("completed")?, "completed")?,
            });
        }

        Ok(counts)
    }
}

fn parse_task_row(row: &Row<'_>) -> RepoResult<Task> {
    let id_text: String = row.get("id")?;
    let id = Uuid::parse_str(&id_text).map_err(|_| {
        RepoError::InvalidData(format!("invalid uuid value `{id_text}` in tasks.id"))
    })?;

    let kind_text: String = row.get("kind")?;
    let kind = TaskKind::parse(&kind_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid task kind `{kind_text}` in tasks.kind"))
    })?;

    let completed = match row.get::<_, i64>("completed")? {
        0 => false,
        1 => true,
        other => {
            return Err(RepoError::InvalidData(format!(
                "invalid completed value `{other}` in tasks.completed"
            )));
        }
    };

    let date_text: String = row.get("scheduled_date")?;
    let scheduled_date = date_from_db(&date_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid date `{date_text}` in tasks.scheduled_date"
        ))
    })?;

    Ok(Task {
        id,
        text: row.get("text")?,
        kind,
        completed,
        scheduled_date,
        created_at: row.get("created_at")?,
    })
}

fn parse_bucket_key(unit: BucketUnit, value: &str) -> RepoResult<BucketKey> {
    let invalid = || RepoError::InvalidData(format!("invalid bucket key `{value}`"));
    match unit {
        BucketUnit::Day => date_from_db(value).map(BucketKey::Day).ok_or_else(invalid),
        BucketUnit::Month => {
            let (year, month) = value.split_once('-').ok_or_else(invalid)?;
            let year = year.parse::<i32>().map_err(|_| invalid())?;
            let month = month.parse::<u32>().map_err(|_| invalid())?;
            if !(1..=12).contains(&month) {
                return Err(invalid());
            }
            Ok(BucketKey::Month { year, month })
        }
    }
}

fn count_from_db(value: i64, column: &str) -> RepoResult<u32> {
    u32::try_from(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid {column} count `{value}`")))
}

fn date_to_db(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn date_from_db(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT).ok()
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}
