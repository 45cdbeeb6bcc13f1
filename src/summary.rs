use jiff::tz::TimeZone;
use tracing::debug;

use crate::config::Config;
use crate::error::Result;
use crate::report::{parse_report, ReportTime};
use crate::ticket::{parse_description, ticket_url};
use crate::tracker::TimeTracker;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub duration_minutes: i64,
    pub timestamp: String,
    pub support_name: String,
    pub ticket_url: String,
    pub subject: String,
}

/// Whatever could be recovered from a report that was missing fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialSummary {
    pub duration_minutes: Option<i64>,
    pub timestamp: Option<String>,
    pub support_name: String,
    pub ticket_url: Option<String>,
    pub subject: Option<String>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopOutcome {
    Full {
        summary: Summary,
        warnings: Vec<String>,
    },
    Partial(PartialSummary),
}

/// Renders the entry's end time in `tz_name`.
///
/// Offset-carrying times are converted; naive times are already wall-clock
/// time in `tz_name`. An unknown zone renders the unconverted time and
/// returns a warning alongside it.
pub fn localize(end: &ReportTime, tz_name: &str) -> (String, Option<String>) {
    let tz = match TimeZone::get(tz_name) {
        Ok(tz) => tz,
        Err(e) => {
            return (
                unconverted(end),
                Some(format!("unknown TIMEZONE `{tz_name}` ({e}); showing unconverted time")),
            );
        }
    };

    let zoned = match end {
        ReportTime::Naive(dt) => naive_to_civil(dt).and_then(|civil| civil.to_zoned(tz)),
        ReportTime::Fixed(dt) => {
            jiff::Timestamp::from_second(dt.timestamp()).map(|ts| ts.to_zoned(tz))
        }
    };
    match zoned {
        Ok(zoned) => (zoned.strftime(TIMESTAMP_FORMAT).to_string(), None),
        Err(e) => (
            unconverted(end),
            Some(format!("could not convert time to {tz_name}: {e}")),
        ),
    }
}

fn unconverted(end: &ReportTime) -> String {
    match end {
        ReportTime::Naive(dt) => dt.format(TIMESTAMP_FORMAT).to_string(),
        ReportTime::Fixed(dt) => dt.format(TIMESTAMP_FORMAT).to_string(),
    }
}

fn naive_to_civil(
    dt: &chrono::NaiveDateTime,
) -> std::result::Result<jiff::civil::DateTime, jiff::Error> {
    use chrono::{Datelike, Timelike};
    jiff::civil::DateTime::new(
        dt.year() as i16,
        dt.month() as i8,
        dt.day() as i8,
        dt.hour() as i8,
        dt.minute() as i8,
        dt.second() as i8,
        0,
    )
}

/// Builds the summary from a `stop` report without failing.
pub fn synthesize(report: &str, config: &Config) -> StopOutcome {
    let entry = parse_report(report);
    let mut warnings = Vec::new();
    let mut missing = Vec::new();

    if entry.is_empty() {
        warnings.push("could not parse the time tracker's stop report".to_string());
    }

    let (ticket_url, subject) = match entry.description.as_deref() {
        Some(description) => match parse_description(description, config) {
            Ok(parsed) => (
                Some(ticket_url(&config.zendesk_base_url, &parsed.ticket_id)),
                Some(parsed.subject),
            ),
            Err(e) => {
                warnings.push(e.to_string());
                (None, Some(description.to_string()))
            }
        },
        None => {
            missing.push("description");
            (None, None)
        }
    };

    if entry.duration_minutes.is_none() {
        missing.push("duration");
    }
    if entry.start.is_none() && entry.stop.is_none() {
        missing.push("start time");
    }

    let end = match (entry.start, entry.duration_minutes) {
        (Some(start), Some(minutes)) => {
            let end = start.plus_minutes(minutes);
            if end.is_none() {
                warnings.push("entry end time is out of range".to_string());
            }
            end
        }
        _ => entry.stop,
    };
    let timestamp = end.map(|end| {
        let (timestamp, warning) = localize(&end, &config.timezone);
        warnings.extend(warning);
        timestamp
    });

    if !missing.is_empty() && !entry.is_empty() {
        warnings.push(format!("missing from stop report: {}", missing.join(", ")));
    }
    debug!(?entry, ?warnings, "synthesized stop summary");

    match (entry.duration_minutes, timestamp, ticket_url, subject) {
        (Some(duration_minutes), Some(timestamp), Some(ticket_url), Some(subject)) => {
            StopOutcome::Full {
                summary: Summary {
                    duration_minutes,
                    timestamp,
                    support_name: config.support_name.clone(),
                    ticket_url,
                    subject,
                },
                warnings,
            }
        }
        (duration_minutes, timestamp, ticket_url, subject) => StopOutcome::Partial(PartialSummary {
            duration_minutes,
            timestamp,
            support_name: config.support_name.clone(),
            ticket_url,
            subject,
            warnings,
        }),
    }
}

/// Stops the running entry and summarises it. Only a failed `stop` is an error.
pub fn stop(tracker: &TimeTracker, config: &Config) -> Result<StopOutcome> {
    let report = tracker.stop()?;
    if !report.is_empty() {
        print!("{report}");
    }
    Ok(synthesize(&report, config))
}
