//! Core domain logic for the dailytask tracker.
//!
//! Owns the recurrence rules, the daily reminder scheduler and the
//! statistics aggregation; routers only call into these APIs.

pub mod clock;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod notify;
pub mod repo;
pub mod scheduler;
pub mod service;

pub use clock::{Clock, SystemClock};
pub use config::{ConfigError, TrackerConfig};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::task::{Task, TaskDraft, TaskId, TaskKind, TaskValidationError};
pub use notify::{Notifier, NotifyError};
pub use repo::task_repo::{
    BucketCount, BucketKey, BucketUnit, RepoError, RepoResult, SqliteTaskRepository,
    TaskListQuery, TaskRepository,
};
pub use scheduler::{CycleReport, DailyScheduler, ReminderCycle, SchedulerError};
pub use service::stats_service::{Granularity, StatisticsService, StatsError, TaskStatistics};
pub use service::task_service::{CompletionOutcome, TaskService, TaskServiceError};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
