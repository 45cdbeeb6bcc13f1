mod cli;
mod clipboard;
mod config;
mod deps;
mod error;
mod format;
mod report;
mod summary;
mod ticket;
mod tracker;
mod validator;

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Context};
use crate::error::TicketTimerError;

const DEBUG_ENV: &str = "TICKET_TIMER_DEBUG";

fn init_tracing() {
    let debug = std::env::var(DEBUG_ENV).is_ok_and(|v| config::is_truthy(&v));
    let filter = if debug {
        EnvFilter::new("ticket_timer=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    init_tracing();

    // clap's version flag is -V; accept -v as well
    let mut args: Vec<String> = std::env::args().collect();
    if args.get(1).is_some_and(|first| first == "-v") {
        args[1] = "--version".to_string();
    }

    let cli = match Cli::try_parse_from(&args) {
        Ok(c) => c,
        Err(e) => {
            e.print().ok();
            return ExitCode::from(if e.use_stderr() { 1 } else { 0 });
        }
    };

    let ctx = Context::from_env();
    match cli::dispatch(cli.command, &ctx) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // the wrapped tool has already reported its own failure
            if let TicketTimerError::ForwardedFailure { .. } = e {
                tracing::debug!(error = %e, "forwarding exit status");
            } else {
                eprintln!("error: {e}");
            }
            ExitCode::from(u8::try_from(e.exit_code()).unwrap_or(1))
        }
    }
}
