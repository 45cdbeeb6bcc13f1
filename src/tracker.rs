use std::path::PathBuf;
use std::process::{Command, ExitStatus, Stdio};

use tracing::debug;

use crate::deps::DependencyGate;
use crate::error::{Result, TicketTimerError};

/// Argument vector for `start`: description, then `--tags`, then `--project`.
pub fn start_args(description: &str, tags: Option<&str>, project: Option<&str>) -> Vec<String> {
    let mut args = vec!["start".to_string(), description.to_string()];
    if let Some(tags) = tags {
        args.extend(["--tags".to_string(), tags.to_string()]);
    }
    if let Some(project) = project {
        args.extend(["--project".to_string(), project.to_string()]);
    }
    args
}

pub fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    1
}

/// The external time-tracking client.
pub struct TimeTracker {
    name: String,
    program: PathBuf,
}

impl TimeTracker {
    pub fn locate(gate: &DependencyGate, name: &str) -> Result<Self> {
        let program = gate
            .ensure(&[name])?
            .pop()
            .ok_or_else(|| TicketTimerError::MissingDependency(name.to_string()))?;
        Ok(Self {
            name: name.to_string(),
            program,
        })
    }

    fn command(&self, args: &[String]) -> Command {
        debug!(program = %self.program.display(), ?args, "running time tracker");
        let mut cmd = Command::new(&self.program);
        cmd.args(args);
        cmd
    }

    fn check(&self, args: &[String], status: ExitStatus) -> Result<()> {
        if status.success() {
            return Ok(());
        }
        Err(TicketTimerError::ForwardedFailure {
            command: format!("{} {}", self.name, args.first().map_or("", String::as_str)),
            code: exit_code(status),
        })
    }

    fn spawn_error(&self, source: std::io::Error) -> TicketTimerError {
        TicketTimerError::Spawn {
            command: self.name.clone(),
            source,
        }
    }

    fn run_inherited(&self, args: &[String]) -> Result<()> {
        let status = self
            .command(args)
            .status()
            .map_err(|e| self.spawn_error(e))?;
        self.check(args, status)
    }

    pub fn start(&self, description: &str, tags: Option<&str>, project: Option<&str>) -> Result<()> {
        self.run_inherited(&start_args(description, tags, project))
    }

    /// Forwards `verb args...` untouched, streams and exit code included.
    pub fn passthrough(&self, verb: &str, rest: &[String]) -> Result<()> {
        let mut args = Vec::with_capacity(rest.len() + 1);
        args.push(verb.to_string());
        args.extend(rest.iter().cloned());
        self.run_inherited(&args)
    }

    /// Runs `stop` and returns its stdout report; stderr goes straight through.
    pub fn stop(&self) -> Result<String> {
        let args = vec!["stop".to_string()];
        let output = self
            .command(&args)
            .stdin(Stdio::inherit())
            .stderr(Stdio::inherit())
            .output()
            .map_err(|e| self.spawn_error(e))?;
        let report = String::from_utf8_lossy(&output.stdout).into_owned();
        self.check(&args, output.status)?;
        Ok(report)
    }
}
