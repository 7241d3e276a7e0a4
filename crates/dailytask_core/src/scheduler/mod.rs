//! Daily reminder scheduler.
//!
//! A single background tokio task waits for the configured local hour, runs
//! the notify-then-reset [`ReminderCycle`], and rearms for the next day.

pub mod cycle;
pub mod daily;

pub use cycle::{alert_body, CycleReport, ReminderCycle, ALERT_TITLE};
pub use daily::{next_fire_at, DailyScheduler, SchedulerError};
