//! Command-line surface for the tracker.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use uuid::Uuid;

/// dailytask - personal task tracker with daily recurring reminders
#[derive(Parser, Debug)]
#[command(name = "dailytask")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file path (defaults to the platform config dir)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Add a task
    Add {
        /// Task text
        text: String,

        /// Revive this task every day
        #[arg(short, long)]
        recurring: bool,

        /// Scheduled date as YYYY-MM-DD (defaults to today)
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },

    /// List every task, newest first
    List,

    /// List tasks scheduled on one date
    On {
        /// Date as YYYY-MM-DD
        date: NaiveDate,
    },

    /// List tasks scheduled between two dates, inclusive
    Range {
        start: NaiveDate,
        end: NaiveDate,
    },

    /// Mark a task completed
    Done { id: Uuid },

    /// Mark a task not completed
    Undo { id: Uuid },

    /// Delete a task
    Delete { id: Uuid },

    /// Print completion statistics as JSON
    Stats {
        /// weekly, monthly or yearly
        granularity: String,
    },

    /// Run the daily reminder scheduler until Ctrl-C
    Watch {
        /// Local hour (0-23) of the daily reminder; overrides the config
        #[arg(long)]
        alert_hour: Option<u8>,
    },

    /// Run one notify-then-reset cycle now
    RunCycle,
}
