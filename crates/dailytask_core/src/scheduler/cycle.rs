//! One daily reminder cycle: notify about unfinished recurring tasks, then
//! reset them.
//!
//! # Invariants
//! - Notification always reflects pre-reset state.
//! - At most one alert is delivered per cycle, and none when nothing is
//!   unfinished.
//! - The reset runs even when the lookup or the delivery failed.

use crate::model::task::{Task, TaskKind};
use crate::notify::Notifier;
use crate::repo::task_repo::{TaskListQuery, TaskRepository};
use crate::service::recurrence::reset_all_recurring;
use log::{error, info, warn};
use std::sync::Arc;

/// Title of the unfinished-tasks alert.
pub const ALERT_TITLE: &str = "Unfinished daily tasks";

const ALERT_INTRO: &str = "You still have these daily tasks to finish:";

/// Summary of one executed cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CycleReport {
    /// Unfinished recurring tasks seen before the reset.
    pub incomplete: usize,
    /// Whether an alert was handed to the notifier successfully.
    pub notified: bool,
    /// Rows touched by the reset; `None` when the reset failed.
    pub reset_rows: Option<usize>,
}

/// Notify-then-reset step run by the daily scheduler.
pub struct ReminderCycle<R> {
    repo: R,
    notifier: Arc<dyn Notifier>,
}

impl<R: TaskRepository> ReminderCycle<R> {
    pub fn new(repo: R, notifier: Arc<dyn Notifier>) -> Self {
        Self { repo, notifier }
    }

    /// Runs the cycle to completion. Never fails; problems are logged and
    /// reflected in the report.
    pub fn run(&self) -> CycleReport {
        let (incomplete, notified) = self.notify_incomplete();
        let reset_rows = reset_all_recurring(&self.repo).ok();
        CycleReport {
            incomplete,
            notified,
            reset_rows,
        }
    }

    fn notify_incomplete(&self) -> (usize, bool) {
        let recurring = match self
            .repo
            .list_tasks(&TaskListQuery::of_kind(TaskKind::Recurring))
        {
            Ok(tasks) => tasks,
            Err(err) => {
                error!(
                    "event=notify_check module=scheduler status=error error_code=lookup_failed error={err}"
                );
                return (0, false);
            }
        };

        let pending: Vec<&Task> = recurring.iter().filter(|task| !task.completed).collect();
        if pending.is_empty() {
            info!("event=notify_check module=scheduler status=skip incomplete=0");
            return (0, false);
        }

        let body = alert_body(pending.iter().map(|task| task.text.as_str()));
        match self.notifier.deliver(ALERT_TITLE, &body) {
            Ok(()) => {
                info!(
                    "event=notify_check module=scheduler status=ok incomplete={}",
                    pending.len()
                );
                (pending.len(), true)
            }
            Err(err) => {
                warn!(
                    "event=notify_check module=scheduler status=error incomplete={} error_code=deliver_failed error={err}",
                    pending.len()
                );
                (pending.len(), false)
            }
        }
    }
}

/// Alert body listing one bullet per task text.
pub fn alert_body<'a>(texts: impl IntoIterator<Item = &'a str>) -> String {
    let mut body = String::from(ALERT_INTRO);
    for text in texts {
        body.push_str("\n• ");
        body.push_str(text);
    }
    body
}

#[cfg(test)]
mod tests {
    use super::alert_body;

    #[test]
    fn alert_body_lists_each_text_on_its_own_line() {
        let body = alert_body(["water plants", "stretch"]);
        let lines: Vec<&str> = body.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1], "• water plants");
        assert_eq!(lines[2], "• stretch");
    }
}
