mod common;

use chrono::NaiveDateTime;
use common::{at, date, memory_repo, FaultyRepo, FixedClock, RecordingNotifier};
use dailytask_core::scheduler::ALERT_TITLE;
use dailytask_core::{
    Clock, DailyScheduler, ReminderCycle, SchedulerError, SqliteTaskRepository, Task, TaskKind,
    TaskListQuery, TaskRepository, TaskService,
};
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn seed(repo: &SqliteTaskRepository) -> Vec<Task> {
    let service = TaskService::new(repo.clone(), FixedClock::on(date(2024, 6, 10)));
    let water = service.add_task("water plants", TaskKind::Recurring, None).unwrap();
    let stretch = service.add_task("stretch", TaskKind::Recurring, None).unwrap();
    let done = service.add_task("journal", TaskKind::Recurring, None).unwrap();
    let regular = service.add_task("pay rent", TaskKind::Regular, None).unwrap();
    // Direct store write: no spawned copy.
    repo.set_completed(done.id, true).unwrap();
    repo.set_completed(regular.id, true).unwrap();
    vec![water, stretch, done, regular]
}

fn recurring_all_incomplete(repo: &SqliteTaskRepository) -> bool {
    repo.list_tasks(&TaskListQuery::of_kind(TaskKind::Recurring))
        .unwrap()
        .iter()
        .all(|task| !task.completed)
}

/// Wall clock stuck just before the alert hour; records every armed deadline.
struct LaggingClock {
    now: NaiveDateTime,
    armed: Mutex<Vec<NaiveDateTime>>,
}

impl LaggingClock {
    fn armed(&self) -> Vec<NaiveDateTime> {
        self.armed.lock().unwrap().clone()
    }
}

impl Clock for LaggingClock {
    fn now(&self) -> NaiveDateTime {
        self.now
    }

    fn duration_until(&self, target: NaiveDateTime) -> Duration {
        self.armed.lock().unwrap().push(target);
        Duration::from_millis(10)
    }
}

async fn wait_until(mut ready: impl FnMut() -> bool) {
    let waited = tokio::time::timeout(Duration::from_secs(5), async {
        while !ready() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    assert!(waited.is_ok(), "condition not reached within 5s");
}

#[test]
fn cycle_notifies_once_with_every_incomplete_text_then_resets() {
    let repo = memory_repo();
    let tasks = seed(&repo);
    let notifier = Arc::new(RecordingNotifier::default());
    let cycle = ReminderCycle::new(repo.clone(), notifier.clone());

    let report = cycle.run();

    assert_eq!(report.incomplete, 2);
    assert!(report.notified);
    assert_eq!(report.reset_rows, Some(3));

    let alerts = notifier.alerts();
    assert_eq!(alerts.len(), 1);
    let (title, body) = &alerts[0];
    assert_eq!(title, ALERT_TITLE);
    assert!(body.contains("water plants"));
    assert!(body.contains("stretch"));
    assert!(!body.contains("journal"));
    assert!(!body.contains("pay rent"));

    assert!(recurring_all_incomplete(&repo));
    // Regular tasks keep their state.
    assert!(repo.get_task(tasks[3].id).unwrap().unwrap().completed);
}

#[test]
fn cycle_without_incomplete_tasks_skips_alert_but_still_resets() {
    let repo = memory_repo();
    let task = TaskService::new(repo.clone(), FixedClock::on(date(2024, 6, 10)))
        .add_task("floss", TaskKind::Recurring, None)
        .unwrap();
    repo.set_completed(task.id, true).unwrap();
    let notifier = Arc::new(RecordingNotifier::default());

    let report = ReminderCycle::new(repo.clone(), notifier.clone()).run();

    assert_eq!(report.incomplete, 0);
    assert!(!report.notified);
    assert!(notifier.alerts().is_empty());
    assert_eq!(report.reset_rows, Some(1));
    assert!(recurring_all_incomplete(&repo));
}

#[test]
fn delivery_failure_is_swallowed_and_reset_still_runs() {
    let repo = memory_repo();
    seed(&repo);
    let notifier = Arc::new(RecordingNotifier::failing());

    let report = ReminderCycle::new(repo.clone(), notifier.clone()).run();

    assert_eq!(notifier.alerts().len(), 1);
    assert!(!report.notified);
    assert_eq!(report.reset_rows, Some(3));
    assert!(recurring_all_incomplete(&repo));
}

#[test]
fn lookup_failure_still_resets() {
    let repo = FaultyRepo::new(memory_repo());
    seed(&repo.inner);
    repo.switches.fail_list.store(true, Ordering::SeqCst);
    let notifier = Arc::new(RecordingNotifier::default());

    let report = ReminderCycle::new(repo.clone(), notifier.clone()).run();

    assert!(notifier.alerts().is_empty());
    assert_eq!(report.reset_rows, Some(3));
    assert!(recurring_all_incomplete(&repo.inner));
}

#[test]
fn reset_failure_is_reported_not_raised() {
    let repo = FaultyRepo::new(memory_repo());
    seed(&repo.inner);
    repo.switches.fail_reset.store(true, Ordering::SeqCst);
    let notifier = Arc::new(RecordingNotifier::default());

    let report = ReminderCycle::new(repo.clone(), notifier.clone()).run();

    assert!(report.notified);
    assert_eq!(report.reset_rows, None);
}

#[test]
fn start_outside_runtime_fails() {
    let mut scheduler = DailyScheduler::new(
        memory_repo(),
        Arc::new(RecordingNotifier::default()),
        Arc::new(FixedClock::on(date(2024, 6, 10))),
    );
    assert_eq!(scheduler.start(16).unwrap_err(), SchedulerError::NoRuntime);
}

#[tokio::test]
async fn start_validates_hour_and_runs_once() {
    let mut scheduler = DailyScheduler::new(
        memory_repo(),
        Arc::new(RecordingNotifier::default()),
        Arc::new(FixedClock::on(date(2024, 6, 10))),
    );

    assert_eq!(scheduler.start(24).unwrap_err(), SchedulerError::InvalidAlertHour(24));
    scheduler.start(16).unwrap();
    assert!(scheduler.is_running());
    assert_eq!(scheduler.start(16).unwrap_err(), SchedulerError::AlreadyStarted);

    scheduler.stop().await;
    assert!(!scheduler.is_running());
}

#[tokio::test]
async fn stop_cancels_pending_timer_before_it_fires() {
    let repo = memory_repo();
    seed(&repo);
    let notifier = Arc::new(RecordingNotifier::default());
    let mut scheduler = DailyScheduler::new(
        repo.clone(),
        notifier.clone(),
        Arc::new(FixedClock::on(date(2024, 6, 10))),
    );

    scheduler.start(16).unwrap();
    tokio::time::timeout(Duration::from_secs(5), scheduler.stop())
        .await
        .unwrap();

    assert!(notifier.alerts().is_empty());
    assert!(!recurring_all_incomplete(&repo));
}

#[tokio::test]
async fn rearmed_timer_fires_again_after_reset() {
    let repo = FaultyRepo::new(memory_repo());
    seed(&repo.inner);
    let notifier = Arc::new(RecordingNotifier::default());
    let clock = FixedClock {
        wait: Duration::from_millis(20),
        ..FixedClock::on(date(2024, 6, 10))
    };
    let mut scheduler = DailyScheduler::new(repo.clone(), notifier.clone(), Arc::new(clock));

    scheduler.start(16).unwrap();
    wait_until(|| notifier.alerts().len() >= 2).await;
    assert!(scheduler.is_running());
    scheduler.stop().await;

    let alerts = notifier.alerts();
    let first = &alerts[0].1;
    assert!(first.contains("water plants"));
    assert!(first.contains("stretch"));
    assert!(!first.contains("journal"));

    // The first reset left every recurring task unfinished again.
    let second = &alerts[1].1;
    for text in ["water plants", "stretch", "journal"] {
        assert!(second.contains(text), "second alert misses {text}");
    }
    assert!(!second.contains("pay rent"));
    assert!(repo.switches.resets.load(Ordering::SeqCst) >= 2);
}

#[tokio::test]
async fn lagging_wall_clock_arms_next_day_instead_of_refiring() {
    let today = date(2024, 6, 10);
    let clock = Arc::new(LaggingClock {
        now: at(today, 15, 59),
        armed: Mutex::new(Vec::new()),
    });
    let notifier = Arc::new(RecordingNotifier::default());
    let mut scheduler = DailyScheduler::new(memory_repo(), notifier.clone(), clock.clone());

    scheduler.start(16).unwrap();
    wait_until(|| clock.armed().len() >= 3).await;
    scheduler.stop().await;

    let armed = clock.armed();
    assert_eq!(armed[0], at(today, 16, 0));
    assert_eq!(armed[1], at(date(2024, 6, 11), 16, 0));
    assert_eq!(armed[2], at(date(2024, 6, 12), 16, 0));
    for pair in armed.windows(2) {
        assert!(pair[1] > pair[0], "deadline {} armed twice", pair[0]);
    }
}
