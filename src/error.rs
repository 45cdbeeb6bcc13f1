use std::io;

#[derive(Debug, thiserror::Error)]
pub enum TicketTimerError {
    #[error("{0}")]
    Parse(String),

    #[error("missing ticket ID: usage `ticket-timer start <ticket-id> [subject]`")]
    MissingTicketId,

    #[error("ticket ID must be numeric, got `{0}`")]
    TicketIdNotNumeric(String),

    #[error("`{0}` was not found on PATH; install it or set the matching *_CMD key in your config")]
    MissingDependency(String),

    #[error("ticket client `{0}` is unavailable; install it or pass --no-validate")]
    ValidatorUnavailable(String),

    #[error("ticket {0} was not found (use --no-validate to skip this check)")]
    TicketNotFound(String),

    #[error("`{command}` exited with status {code}")]
    ForwardedFailure { command: String, code: i32 },

    #[error("failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("config I/O error: {0}")]
    ConfigIo(#[from] io::Error),
}

impl TicketTimerError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ForwardedFailure { code, .. } => *code,
            _ => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, TicketTimerError>;
