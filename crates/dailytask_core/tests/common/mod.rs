#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use dailytask_core::db::open_db_in_memory;
use dailytask_core::{
    BucketCount, BucketUnit, Clock, Notifier, NotifyError, RepoError, RepoResult,
    SqliteTaskRepository, Task, TaskDraft, TaskId, TaskKind, TaskListQuery, TaskRepository,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

pub fn at(day: NaiveDate, hour: u32, min: u32) -> NaiveDateTime {
    day.and_hms_opt(hour, min, 0).unwrap()
}

pub fn memory_repo() -> SqliteTaskRepository {
    SqliteTaskRepository::new(open_db_in_memory().unwrap())
}

/// Clock pinned at one instant; every timer wait is `wait`.
pub struct FixedClock {
    pub now: NaiveDateTime,
    pub wait: Duration,
}

impl FixedClock {
    pub fn on(day: NaiveDate) -> Self {
        Self {
            now: at(day, 9, 0),
            wait: Duration::from_secs(3600),
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.now
    }

    fn duration_until(&self, _target: NaiveDateTime) -> Duration {
        self.wait
    }
}

/// Notifier that keeps every delivered alert.
#[derive(Default)]
pub struct RecordingNotifier {
    pub alerts: Mutex<Vec<(String, String)>>,
    pub fail: AtomicBool,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        Self {
            alerts: Mutex::new(Vec::new()),
            fail: AtomicBool::new(true),
        }
    }

    pub fn alerts(&self) -> Vec<(String, String)> {
        self.alerts.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn deliver(&self, title: &str, body: &str) -> Result<(), NotifyError> {
        self.alerts
            .lock()
            .unwrap()
            .push((title.to_string(), body.to_string()));
        if self.fail.load(Ordering::SeqCst) {
            return Err(NotifyError::new("display unavailable"));
        }
        Ok(())
    }
}

/// Repository wrapper that counts calls and injects failures.
#[derive(Default)]
pub struct FaultSwitches {
    pub fail_create: AtomicBool,
    pub fail_reset: AtomicBool,
    pub fail_list: AtomicBool,
    pub bucket_queries: AtomicUsize,
    pub resets: AtomicUsize,
}

#[derive(Clone)]
pub struct FaultyRepo {
    pub inner: SqliteTaskRepository,
    pub switches: Arc<FaultSwitches>,
}

impl FaultyRepo {
    pub fn new(inner: SqliteTaskRepository) -> Self {
        Self {
            inner,
            switches: Arc::new(FaultSwitches::default()),
        }
    }
}

fn injected() -> RepoError {
    RepoError::InvalidData("injected failure".to_string())
}

impl TaskRepository for FaultyRepo {
    fn create_task(&self, draft: &TaskDraft) -> RepoResult<Task> {
        if self.switches.fail_create.load(Ordering::SeqCst) {
            return Err(injected());
        }
        self.inner.create_task(draft)
    }

    fn get_task(&self, id: TaskId) -> RepoResult<Option<Task>> {
        self.inner.get_task(id)
    }

    fn set_completed(&self, id: TaskId, completed: bool) -> RepoResult<()> {
        self.inner.set_completed(id, completed)
    }

    fn delete_task(&self, id: TaskId) -> RepoResult<()> {
        self.inner.delete_task(id)
    }

    fn list_tasks(&self, query: &TaskListQuery) -> RepoResult<Vec<Task>> {
        if self.switches.fail_list.load(Ordering::SeqCst) {
            return Err(injected());
        }
        self.inner.list_tasks(query)
    }

    fn reset_completed(&self, kind: TaskKind) -> RepoResult<usize> {
        self.switches.resets.fetch_add(1, Ordering::SeqCst);
        if self.switches.fail_reset.load(Ordering::SeqCst) {
            return Err(injected());
        }
        self.inner.reset_completed(kind)
    }

    fn bucket_counts(
        &self,
        unit: BucketUnit,
        start: NaiveDate,
        end: NaiveDate,
    ) -> RepoResult<Vec<BucketCount>> {
        self.switches.bucket_queries.fetch_add(1, Ordering::SeqCst);
        self.inner.bucket_counts(unit, start, end)
    }
}
