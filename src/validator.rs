use std::io::IsTerminal;
use std::process::{Command, Stdio};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::debug;

use crate::deps::DependencyGate;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validation {
    Exists,
    /// Carries the client's stderr, if it said anything.
    NotFound(Option<String>),
    ValidatorUnavailable,
}

pub fn lookup_args(ticket_id: &str) -> Vec<String> {
    vec!["ticket".into(), "show".into(), ticket_id.into()]
}

/// Read-only ticket lookup through the helpdesk client.
pub struct TicketValidator<'a> {
    gate: &'a DependencyGate,
    client: &'a str,
}

impl<'a> TicketValidator<'a> {
    pub fn new(gate: &'a DependencyGate, client: &'a str) -> Self {
        Self { gate, client }
    }

    pub fn validate(&self, ticket_id: &str) -> Validation {
        let Some(program) = self.gate.find(self.client) else {
            debug!(client = self.client, "ticket client not on PATH");
            return Validation::ValidatorUnavailable;
        };
        let args = lookup_args(ticket_id);
        debug!(program = %program.display(), ?args, "looking up ticket");

        let spinner = spinner(ticket_id);
        let output = Command::new(&program)
            .args(&args)
            .stdin(Stdio::null())
            .output();
        spinner.finish_and_clear();

        match output {
            Err(e) => {
                debug!(error = %e, "ticket client failed to start");
                Validation::ValidatorUnavailable
            }
            Ok(out) => {
                let stderr = String::from_utf8_lossy(&out.stderr).trim().to_string();
                if !stderr.is_empty() {
                    debug!(status = %out.status, %stderr, "ticket client stderr");
                }
                let found = out.status.success()
                    && !String::from_utf8_lossy(&out.stdout).trim().is_empty();
                if found {
                    Validation::Exists
                } else {
                    Validation::NotFound((!stderr.is_empty()).then_some(stderr))
                }
            }
        }
    }
}

fn spinner(ticket_id: &str) -> ProgressBar {
    if !std::io::stderr().is_terminal() {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg} [{elapsed}]") {
        pb.set_style(style);
    }
    pb.set_message(format!("Checking ticket {ticket_id}"));
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_args_shape() {
        assert_eq!(lookup_args("77"), vec!["ticket", "show", "77"]);
    }

    #[test]
    fn unavailable_without_client() {
        let dir = tempfile::tempdir().unwrap();
        let gate = DependencyGate::new(Some(dir.path().as_os_str().to_owned()));
        let validator = TicketValidator::new(&gate, "zendesk");
        assert_eq!(validator.validate("1"), Validation::ValidatorUnavailable);
    }

    #[cfg(unix)]
    mod process {
        use super::super::*;
        use std::os::unix::fs::PermissionsExt;

        fn gate_with(dir: &std::path::Path, body: &str) -> DependencyGate {
            let path = dir.join("zendesk");
            std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            DependencyGate::new(Some(dir.as_os_str().to_owned()))
        }

        #[test]
        fn exists_on_output() {
            let dir = tempfile::tempdir().unwrap();
            let gate = gate_with(dir.path(), "echo \"Ticket $3: Printer on fire\"");
            let validator = TicketValidator::new(&gate, "zendesk");
            assert_eq!(validator.validate("12345"), Validation::Exists);
        }

        #[test]
        fn not_found_on_failure() {
            let dir = tempfile::tempdir().unwrap();
            let gate = gate_with(dir.path(), "echo found; exit 1");
            let validator = TicketValidator::new(&gate, "zendesk");
            assert_eq!(validator.validate("12345"), Validation::NotFound(None));
        }

        #[test]
        fn not_found_on_empty_output() {
            let dir = tempfile::tempdir().unwrap();
            let gate = gate_with(dir.path(), "exit 0");
            let validator = TicketValidator::new(&gate, "zendesk");
            assert_eq!(validator.validate("12345"), Validation::NotFound(None));
        }

        #[test]
        fn client_error_output_is_kept() {
            let dir = tempfile::tempdir().unwrap();
            let gate = gate_with(dir.path(), "echo '401 Unauthorized' >&2; exit 1");
            let validator = TicketValidator::new(&gate, "zendesk");
            assert_eq!(
                validator.validate("12345"),
                Validation::NotFound(Some("401 Unauthorized".to_string()))
            );
        }
    }
}
