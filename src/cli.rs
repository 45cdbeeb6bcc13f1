use std::cell::OnceCell;
use std::ffi::OsString;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use tracing::debug;

use crate::clipboard;
use crate::config::{candidate_paths, config_path, resolve, save_config_to, Config, KEYS};
use crate::deps::DependencyGate;
use crate::error::{Result, TicketTimerError};
use crate::format::{partial_summary_line, summary_line};
use crate::summary::{self, StopOutcome};
use crate::ticket::{format_description, validate_ticket_id};
use crate::tracker::TimeTracker;
use crate::validator::{TicketValidator, Validation};

#[derive(Parser)]
#[command(
    name = "ticket-timer",
    version,
    about = "Track time against helpdesk tickets",
    after_help = "Any other subcommand is passed through to the time tracker unchanged."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create or update the config file interactively
    Init,
    /// Start a time entry for a ticket
    Start(StartArgs),
    /// Stop the running entry and print a ticket summary
    Stop,
    /// Show the running entry
    Status {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Inspect the resolved configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    #[command(external_subcommand)]
    Passthrough(Vec<String>),
}

#[derive(Args)]
pub struct StartArgs {
    /// Numeric helpdesk ticket ID
    pub ticket_id: Option<String>,

    /// Entry subject (defaults to DEFAULT_SUBJECT)
    pub subject: Option<String>,

    /// Skip checking that the ticket exists
    #[arg(long)]
    pub no_validate: bool,

    /// Comma-separated tags for the entry
    #[arg(long, value_name = "CSV")]
    pub tags: Option<String>,

    /// Project to file the entry under
    #[arg(long, value_name = "ID")]
    pub project: Option<String>,
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the path `init` writes to
    Path,
    /// Show the resolved values and where they came from
    Show,
}

/// Per-invocation state; the config file is read at most once.
pub struct Context {
    cwd: Option<PathBuf>,
    gate: DependencyGate,
    config: OnceCell<Config>,
}

impl Context {
    pub fn new(cwd: Option<PathBuf>, path_env: Option<OsString>) -> Self {
        Self {
            cwd,
            gate: DependencyGate::new(path_env),
            config: OnceCell::new(),
        }
    }

    pub fn from_env() -> Self {
        Self::new(std::env::current_dir().ok(), std::env::var_os("PATH"))
    }

    fn candidates(&self) -> Vec<PathBuf> {
        candidate_paths(self.cwd.as_deref())
    }

    pub fn config(&self) -> &Config {
        self.config.get_or_init(|| {
            let resolved = resolve(&self.candidates());
            for warning in &resolved.warnings {
                eprintln!("warning: {warning}");
            }
            resolved.config
        })
    }
}

fn non_empty_flag(value: Option<&str>, flag: &str) -> Result<Option<String>> {
    match value.map(str::trim) {
        Some("") => Err(TicketTimerError::Parse(format!("--{flag} needs a non-empty value"))),
        other => Ok(other.map(str::to_owned)),
    }
}

pub fn handle_start(args: StartArgs, ctx: &Context) -> Result<()> {
    let ticket_id = validate_ticket_id(args.ticket_id.as_deref())?;
    let tags = non_empty_flag(args.tags.as_deref(), "tags")?;
    let project = non_empty_flag(args.project.as_deref(), "project")?;
    let config = ctx.config();

    if args.no_validate {
        debug!(ticket_id, "ticket validation skipped");
    } else {
        let validator = TicketValidator::new(&ctx.gate, &config.ticket_client_cmd);
        match validator.validate(ticket_id) {
            Validation::Exists => debug!(ticket_id, "ticket exists"),
            Validation::NotFound(detail) => {
                if let Some(detail) = detail {
                    eprintln!("{}: {detail}", config.ticket_client_cmd);
                }
                return Err(TicketTimerError::TicketNotFound(ticket_id.to_string()));
            }
            Validation::ValidatorUnavailable => {
                return Err(TicketTimerError::ValidatorUnavailable(
                    config.ticket_client_cmd.clone(),
                ))
            }
        }
    }

    let description = format_description(ticket_id, args.subject.as_deref(), config);
    let tracker = TimeTracker::locate(&ctx.gate, &config.time_tracker_cmd)?;
    tracker.start(&description, tags.as_deref(), project.as_deref())
}

pub fn handle_stop(ctx: &Context) -> Result<()> {
    let config = ctx.config();
    let tracker = TimeTracker::locate(&ctx.gate, &config.time_tracker_cmd)?;

    match summary::stop(&tracker, config)? {
        StopOutcome::Full { summary, warnings } => {
            for warning in &warnings {
                eprintln!("warning: {warning}");
            }
            let line = summary_line(&summary);
            println!("{line}");
            if config.copy_to_clipboard {
                match clipboard::copy(&ctx.gate, &line) {
                    Ok(tool) => eprintln!("Summary copied to clipboard ({tool})"),
                    Err(e) => eprintln!("warning: clipboard copy failed: {e}"),
                }
            }
        }
        StopOutcome::Partial(partial) => {
            for warning in &partial.warnings {
                eprintln!("warning: {warning}");
            }
            eprintln!("warning: summary is incomplete; the time entry was stopped");
            println!("{}", partial_summary_line(&partial));
        }
    }
    Ok(())
}

pub fn handle_passthrough(verb: &str, rest: &[String], ctx: &Context) -> Result<()> {
    let tracker = TimeTracker::locate(&ctx.gate, &ctx.config().time_tracker_cmd)?;
    tracker.passthrough(verb, rest)
}

/// Prompts for every key on `output`, reading answers from `input`.
///
/// An empty answer keeps the shown value; EOF keeps all remaining ones.
pub fn prompt_config<R: BufRead, W: Write>(
    mut input: R,
    mut output: W,
    current: &Config,
) -> Result<Config> {
    let mut updated = current.clone();
    for key in KEYS {
        let shown = current.get(key).unwrap_or_default();
        write!(output, "{key} [{shown}]: ")?;
        output.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            writeln!(output)?;
            break;
        }
        let answer = line.trim();
        if !answer.is_empty() {
            updated.set(key, answer.to_string());
        }
    }
    Ok(updated)
}

pub fn handle_init_with_path<R: BufRead, W: Write>(
    input: R,
    mut output: W,
    path: &Path,
) -> Result<()> {
    let current = resolve(&[path.to_path_buf()]).config;
    writeln!(output, "Configuring {}", path.display())?;
    let config = prompt_config(input, &mut output, &current)?;
    save_config_to(path, &config)?;
    writeln!(output, "Saved {}", path.display())?;
    Ok(())
}

pub fn handle_init() -> Result<()> {
    let stdin = std::io::stdin();
    handle_init_with_path(stdin.lock(), std::io::stdout(), &config_path())
}

pub fn handle_config(action: ConfigAction, ctx: &Context) -> Result<()> {
    match action {
        ConfigAction::Path => {
            println!("{}", config_path().display());
            Ok(())
        }
        ConfigAction::Show => {
            let resolved = resolve(&ctx.candidates());
            match &resolved.source {
                Some(path) => println!("source: {}", path.display()),
                None => println!("source: (defaults)"),
            }
            for key in KEYS {
                println!("{key}={}", resolved.config.get(key).unwrap_or_default());
            }
            Ok(())
        }
    }
}

pub fn dispatch(command: Commands, ctx: &Context) -> Result<()> {
    match command {
        Commands::Init => handle_init(),
        Commands::Start(args) => handle_start(args, ctx),
        Commands::Stop => handle_stop(ctx),
        Commands::Status { args } => handle_passthrough("status", &args, ctx),
        Commands::Config { action } => handle_config(action, ctx),
        Commands::Passthrough(argv) => match argv.split_first() {
            Some((verb, rest)) => handle_passthrough(verb, rest, ctx),
            None => Err(TicketTimerError::Parse("missing subcommand".into())),
        },
    }
}
