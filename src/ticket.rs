use std::sync::LazyLock;

use regex::Regex;

use crate::config::Config;
use crate::error::{Result, TicketTimerError};

static BRACKETED_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^\s*\[[^\]0-9]*([0-9]+)[^\]]*\]\s*(.*)$").expect("valid bracket regex")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedDescription {
    pub ticket_id: String,
    pub subject: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("no ticket ID found in description `{0}`")]
pub struct UnparseableDescription(pub String);

pub fn is_ticket_id(value: &str) -> bool {
    !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit())
}

/// Checks a raw `start` argument.
pub fn validate_ticket_id(value: Option<&str>) -> Result<&str> {
    let value = value.ok_or(TicketTimerError::MissingTicketId)?;
    if !is_ticket_id(value) {
        return Err(TicketTimerError::TicketIdNotNumeric(value.to_string()));
    }
    Ok(value)
}

pub fn format_description(ticket_id: &str, subject: Option<&str>, config: &Config) -> String {
    let subject = subject.unwrap_or(&config.default_subject);
    format!(
        "[{}{ticket_id}{}] {subject}",
        config.ticket_prefix, config.ticket_suffix
    )
}

pub fn parse_description(
    description: &str,
    config: &Config,
) -> std::result::Result<ParsedDescription, UnparseableDescription> {
    let exact = format!(
        r"(?s)^\[{}([0-9]+){}\] ?(.*)$",
        regex::escape(&config.ticket_prefix),
        regex::escape(&config.ticket_suffix)
    );
    if let Some(found) = Regex::new(&exact).ok().and_then(|re| re.captures(description)) {
        return Ok(ParsedDescription {
            ticket_id: found[1].to_string(),
            subject: found[2].to_string(),
        });
    }

    // Written under a different prefix/suffix: take the digits inside the brackets.
    if let Some(found) = BRACKETED_ID.captures(description) {
        return Ok(ParsedDescription {
            ticket_id: found[1].to_string(),
            subject: found[2].trim_end().to_string(),
        });
    }

    Err(UnparseableDescription(description.to_string()))
}

pub fn ticket_url(base_url: &str, ticket_id: &str) -> String {
    format!(
        "{}/agent/tickets/{ticket_id}",
        base_url.trim_end_matches('/')
    )
}
