//! `dailytask` command-line entry point.
//!
//! # Responsibility
//! - Resolve configuration and logging before any store access.
//! - Dispatch to command handlers and map failures to exit code 1.

use clap::Parser;
use dailytask_core::{init_logging, TrackerConfig};
use std::process::ExitCode;

mod cli;
mod commands;

use cli::Cli;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(TrackerConfig::default_config_path);
    let config = match TrackerConfig::load_or_default(&config_path)
        .and_then(|config| config.validate().map(|()| config))
    {
        Ok(config) => config,
        Err(err) => {
            eprintln!("error: config {}: {err}", config_path.display());
            return ExitCode::FAILURE;
        }
    };

    // Logging is best-effort; the tracker still works without a log file.
    if let Err(err) = init_logging(&config.log_level, &config.log_dir) {
        eprintln!("warning: logging disabled: {err}");
    }

    match commands::run(cli.command, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
