//! Self-rearming daily timer.
//!
//! # Responsibility
//! - Fire the reminder cycle once per local calendar day at `alert_hour:00`.
//! - Rearm after every cycle, deriving the next deadline from the wall clock.
//!
//! # Invariants
//! - At most one timer is outstanding; cycles never overlap.
//! - Deadlines are recomputed from "now" on each arming, never by adding a
//!   fixed 24h to the previous one.
//! - `stop` cancels only the pending wait; an in-flight cycle finishes first.

use crate::clock::Clock;
use crate::notify::Notifier;
use crate::repo::task_repo::TaskRepository;
use crate::scheduler::cycle::ReminderCycle;
use chrono::NaiveDateTime;
use log::{error, info};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Errors from arming the daily scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    /// Hour outside `0..=23`.
    InvalidAlertHour(u8),
    /// `start` was already called on this scheduler.
    AlreadyStarted,
    /// `start` was called outside a tokio runtime.
    NoRuntime,
    /// The next deadline is beyond the representable calendar.
    DeadlineOutOfRange(NaiveDateTime),
}

impl Display for SchedulerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidAlertHour(hour) => {
                write!(f, "alert hour {hour} is out of range; expected 0..=23")
            }
            Self::AlreadyStarted => write!(f, "daily scheduler already started"),
            Self::NoRuntime => write!(f, "daily scheduler requires a running tokio runtime"),
            Self::DeadlineOutOfRange(now) => {
                write!(f, "cannot compute next deadline after {now}")
            }
        }
    }
}

impl Error for SchedulerError {}

/// Next local wall-clock instant at `alert_hour:00:00` strictly after `now`.
///
/// Today's occurrence when it is still ahead, tomorrow's otherwise.
pub fn next_fire_at(now: NaiveDateTime, alert_hour: u8) -> Result<NaiveDateTime, SchedulerError> {
    let hour = u32::from(alert_hour);
    let today_at = now
        .date()
        .and_hms_opt(hour, 0, 0)
        .ok_or(SchedulerError::InvalidAlertHour(alert_hour))?;
    if now < today_at {
        return Ok(today_at);
    }

    now.date()
        .succ_opt()
        .and_then(|tomorrow| tomorrow.and_hms_opt(hour, 0, 0))
        .ok_or(SchedulerError::DeadlineOutOfRange(now))
}

struct Running {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Owned daily scheduler driving one [`ReminderCycle`].
pub struct DailyScheduler<R> {
    cycle: Arc<ReminderCycle<R>>,
    clock: Arc<dyn Clock>,
    started: bool,
    running: Option<Running>,
}

impl<R> DailyScheduler<R>
where
    R: TaskRepository + Send + Sync + 'static,
{
    /// Builds a stopped scheduler. The store handle is its only shared
    /// mutable dependency.
    pub fn new(repo: R, notifier: Arc<dyn Notifier>, clock: Arc<dyn Clock>) -> Self {
        Self {
            cycle: Arc::new(ReminderCycle::new(repo, notifier)),
            clock,
            started: false,
            running: None,
        }
    }

    /// Arms the timer for the next `alert_hour:00` and keeps rearming daily.
    ///
    /// Must be called from within a tokio runtime, at most once.
    pub fn start(&mut self, alert_hour: u8) -> Result<(), SchedulerError> {
        if alert_hour > 23 {
            return Err(SchedulerError::InvalidAlertHour(alert_hour));
        }
        if self.started {
            return Err(SchedulerError::AlreadyStarted);
        }
        let runtime =
            tokio::runtime::Handle::try_current().map_err(|_| SchedulerError::NoRuntime)?;
        // Surface calendar overflow to the caller instead of the background loop.
        next_fire_at(self.clock.now(), alert_hour)?;

        let cancel = CancellationToken::new();
        let handle = runtime.spawn(run_loop(
            Arc::clone(&self.cycle),
            Arc::clone(&self.clock),
            alert_hour,
            cancel.clone(),
        ));
        self.started = true;
        self.running = Some(Running { cancel, handle });
        info!("event=scheduler_start module=scheduler status=ok alert_hour={alert_hour}");
        Ok(())
    }

    /// Cancels the pending timer and waits for an in-flight cycle to finish.
    pub async fn stop(&mut self) {
        let Some(running) = self.running.take() else {
            return;
        };
        running.cancel.cancel();
        if let Err(err) = running.handle.await {
            error!("event=scheduler_stop module=scheduler status=error error={err}");
            return;
        }
        info!("event=scheduler_stop module=scheduler status=ok");
    }

    /// Whether a timer loop is currently active.
    pub fn is_running(&self) -> bool {
        self.running
            .as_ref()
            .is_some_and(|running| !running.handle.is_finished())
    }
}

impl<R> Drop for DailyScheduler<R> {
    fn drop(&mut self) {
        if let Some(running) = self.running.take() {
            running.cancel.cancel();
        }
    }
}

async fn run_loop<R>(
    cycle: Arc<ReminderCycle<R>>,
    clock: Arc<dyn Clock>,
    alert_hour: u8,
    cancel: CancellationToken,
) where
    R: TaskRepository + Send + Sync + 'static,
{
    let mut last_deadline: Option<NaiveDateTime> = None;

    loop {
        // A wall clock that lags the timer must not re-fire the same deadline.
        let now = clock.now();
        let reference = last_deadline.map_or(now, |previous| now.max(previous));
        let deadline = match next_fire_at(reference, alert_hour) {
            Ok(deadline) => deadline,
            Err(err) => {
                error!(
                    "event=scheduler_arm module=scheduler status=error error_code=deadline_failed error={err}"
                );
                return;
            }
        };
        let wait = clock.duration_until(deadline);
        info!(
            "event=scheduler_arm module=scheduler status=ok deadline={deadline} wait_secs={}",
            wait.as_secs()
        );

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!("event=scheduler_arm module=scheduler status=cancelled deadline={deadline}");
                return;
            }
            _ = tokio::time::sleep(wait) => {}
        }

        info!("event=scheduler_fire module=scheduler status=start deadline={deadline}");
        let running_cycle = Arc::clone(&cycle);
        match tokio::task::spawn_blocking(move || running_cycle.run()).await {
            Ok(report) => info!(
                "event=scheduler_fire module=scheduler status=ok incomplete={} notified={} reset_ok={}",
                report.incomplete,
                report.notified,
                report.reset_rows.is_some()
            ),
            Err(err) => error!(
                "event=scheduler_fire module=scheduler status=error error_code=cycle_panicked error={err}"
            ),
        }
        last_deadline = Some(deadline);
    }
}

#[cfg(test)]
mod tests {
    use super::{next_fire_at, SchedulerError};
    use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

    fn at(day: u32, hour: u32, min: u32, sec: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, day)
            .unwrap()
            .and_hms_opt(hour, min, sec)
            .unwrap()
    }

    #[test]
    fn fires_today_when_hour_is_ahead() {
        assert_eq!(next_fire_at(at(10, 9, 30, 0), 16).unwrap(), at(10, 16, 0, 0));
    }

    #[test]
    fn fires_tomorrow_when_hour_has_passed() {
        assert_eq!(next_fire_at(at(10, 17, 0, 0), 16).unwrap(), at(11, 16, 0, 0));
    }

    #[test]
    fn exact_deadline_moves_to_tomorrow() {
        assert_eq!(next_fire_at(at(10, 16, 0, 0), 16).unwrap(), at(11, 16, 0, 0));
    }

    #[test]
    fn midnight_alert_targets_next_midnight() {
        assert_eq!(next_fire_at(at(10, 0, 0, 1), 0).unwrap(), at(11, 0, 0, 0));
    }

    #[test]
    fn deadline_is_future_and_within_a_day_for_every_hour() {
        let now = at(10, 12, 34, 56);
        for hour in 0..=23 {
            let deadline = next_fire_at(now, hour).unwrap();
            assert!(deadline > now);
            assert!(deadline - now <= chrono::Duration::hours(24));
            let expected = NaiveTime::from_hms_opt(u32::from(hour), 0, 0).unwrap();
            assert_eq!(deadline.time(), expected);
        }
    }

    #[test]
    fn month_end_rolls_into_next_month() {
        let now = NaiveDate::from_ymd_opt(2024, 6, 30)
            .unwrap()
            .and_hms_opt(23, 0, 0)
            .unwrap();
        let expected = NaiveDate::from_ymd_opt(2024, 7, 1)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();
        assert_eq!(next_fire_at(now, 8).unwrap(), expected);
    }

    #[test]
    fn rejects_out_of_range_hour() {
        assert_eq!(
            next_fire_at(at(10, 0, 0, 0), 24).unwrap_err(),
            SchedulerError::InvalidAlertHour(24)
        );
    }
}
