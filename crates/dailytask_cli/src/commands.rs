//! Command handlers wiring the CLI to the core services.
//!
//! # Invariants
//! - Every handler opens the store through `open_db`, so migrations run first.
//! - Output goes to stdout; failures bubble up as [`CliError`].

use crate::cli::Commands;
use dailytask_core::db::{open_db, DbError};
use dailytask_core::{
    CompletionOutcome, DailyScheduler, Notifier, NotifyError, ReminderCycle, SchedulerError,
    SqliteTaskRepository, StatisticsService, StatsError, SystemClock, Task, TaskKind, TaskService,
    TaskServiceError, TrackerConfig,
};
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug)]
pub enum CliError {
    Db(DbError),
    Task(TaskServiceError),
    Stats(StatsError),
    Scheduler(SchedulerError),
    Runtime(std::io::Error),
    Output(serde_json::Error),
}

impl Display for CliError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "database: {err}"),
            Self::Task(err) => write!(f, "{err}"),
            Self::Stats(err) => write!(f, "{err}"),
            Self::Scheduler(err) => write!(f, "scheduler: {err}"),
            Self::Runtime(err) => write!(f, "runtime: {err}"),
            Self::Output(err) => write!(f, "output: {err}"),
        }
    }
}

impl Error for CliError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Task(err) => Some(err),
            Self::Stats(err) => Some(err),
            Self::Scheduler(err) => Some(err),
            Self::Runtime(err) => Some(err),
            Self::Output(err) => Some(err),
        }
    }
}

impl From<DbError> for CliError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<TaskServiceError> for CliError {
    fn from(value: TaskServiceError) -> Self {
        Self::Task(value)
    }
}

impl From<StatsError> for CliError {
    fn from(value: StatsError) -> Self {
        Self::Stats(value)
    }
}

impl From<SchedulerError> for CliError {
    fn from(value: SchedulerError) -> Self {
        Self::Scheduler(value)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(value: serde_json::Error) -> Self {
        Self::Output(value)
    }
}

/// Prints alerts to the terminal.
struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn deliver(&self, title: &str, body: &str) -> Result<(), NotifyError> {
        println!("\n== {title} ==\n{body}\n");
        Ok(())
    }
}

pub fn run(command: Commands, config: &TrackerConfig) -> Result<(), CliError> {
    let repo = SqliteTaskRepository::new(open_db(&config.db_path)?);
    let tasks = TaskService::new(repo.clone(), SystemClock);

    match command {
        Commands::Add {
            text,
            recurring,
            date,
        } => {
            let kind = if recurring {
                TaskKind::Recurring
            } else {
                TaskKind::Regular
            };
            let task = tasks.add_task(&text, kind, date)?;
            println!("added {}", task.id);
        }
        Commands::List => print_tasks(&tasks.list_tasks()?),
        Commands::On { date } => print_tasks(&tasks.tasks_on_date(date)?),
        Commands::Range { start, end } => print_tasks(&tasks.tasks_in_range(start, end)?),
        Commands::Done { id } => toggle(&tasks, id, true)?,
        Commands::Undo { id } => toggle(&tasks, id, false)?,
        Commands::Delete { id } => {
            tasks.delete_task(id)?;
            println!("deleted {id}");
        }
        Commands::Stats { granularity } => {
            let stats = StatisticsService::new(repo, SystemClock).statistics_for(&granularity)?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Commands::Watch { alert_hour } => {
            watch(repo, alert_hour.unwrap_or(config.alert_hour))?;
        }
        Commands::RunCycle => {
            let report = ReminderCycle::new(repo, Arc::new(TerminalNotifier)).run();
            match report.reset_rows {
                Some(rows) => println!(
                    "cycle done: {} unfinished, {rows} recurring task(s) reset",
                    report.incomplete
                ),
                None => println!(
                    "cycle done: {} unfinished, reset failed (see log)",
                    report.incomplete
                ),
            }
        }
    }
    Ok(())
}

fn toggle(
    tasks: &TaskService<SqliteTaskRepository, SystemClock>,
    id: Uuid,
    completed: bool,
) -> Result<(), CliError> {
    match tasks.set_completed(id, completed)? {
        CompletionOutcome::Updated => println!("updated {id}"),
        CompletionOutcome::SpawnedNext(next) => {
            println!("updated {id}; next occurrence {} on {}", next.id, next.scheduled_date)
        }
        CompletionOutcome::SpawnFailed => {
            println!("updated {id}; next occurrence could not be created (see log)")
        }
    }
    Ok(())
}

fn watch(repo: SqliteTaskRepository, alert_hour: u8) -> Result<(), CliError> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)?;

    runtime.block_on(async {
        let mut scheduler =
            DailyScheduler::new(repo, Arc::new(TerminalNotifier), Arc::new(SystemClock));
        scheduler.start(alert_hour)?;
        println!("watching; daily reminder at {alert_hour:02}:00, Ctrl-C to stop");

        let signal = tokio::signal::ctrl_c().await;
        scheduler.stop().await;
        info!("event=cli_watch module=cli status=stopped");
        signal.map_err(CliError::Runtime)
    })
}

fn print_tasks(tasks: &[Task]) {
    if tasks.is_empty() {
        println!("no tasks");
        return;
    }
    for task in tasks {
        println!("{}", task_line(task));
    }
}

fn task_line(task: &Task) -> String {
    let mark = if task.completed { "x" } else { " " };
    let kind = if task.is_recurring() { " (daily)" } else { "" };
    format!("[{mark}] {} {}{kind} {}", task.id, task.scheduled_date, task.text)
}
