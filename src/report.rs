use std::sync::LazyLock;

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeDelta};
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportTime {
    /// Wall-clock time with no zone information.
    Naive(NaiveDateTime),
    Fixed(DateTime<FixedOffset>),
}

impl ReportTime {
    fn minutes_until(&self, later: &ReportTime) -> Option<i64> {
        let delta = match (self, later) {
            (Self::Naive(a), Self::Naive(b)) => *b - *a,
            (Self::Fixed(a), Self::Fixed(b)) => *b - *a,
            _ => return None,
        };
        Some(delta.num_minutes().max(0))
    }

    /// `None` when the result falls outside chrono's range.
    pub fn plus_minutes(&self, minutes: i64) -> Option<ReportTime> {
        let delta = TimeDelta::try_minutes(minutes.max(0))?;
        match self {
            Self::Naive(dt) => dt.checked_add_signed(delta).map(Self::Naive),
            Self::Fixed(dt) => dt.checked_add_signed(delta).map(Self::Fixed),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
/// Fields scraped from a `stop` report; any of them may be missing.
pub struct EntryReport {
    pub description: Option<String>,
    pub start: Option<ReportTime>,
    pub stop: Option<ReportTime>,
    pub duration_minutes: Option<i64>,
}

impl EntryReport {
    pub fn is_empty(&self) -> bool {
        self.description.is_none() && self.start.is_none() && self.duration_minutes.is_none()
    }
}

pub trait EntryReportParser {
    fn name(&self) -> &'static str;

    /// `None` when the text is not in this parser's format at all.
    fn parse(&self, report: &str) -> Option<EntryReport>;
}

static DATETIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\d{4}[-/]\d{2}[-/]\d{2}[T ]\d{2}:\d{2}(?::\d{2}(?:\.\d+)?)?(?:Z|[+-]\d{2}:?\d{2})?",
    )
    .expect("valid datetime regex")
});

static CLOCK_DURATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d+):(\d{2})(?::(\d{2}))?\b").expect("valid clock regex"));

static UNIT_DURATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?:(\d+)\s*h(?:ours?|rs?)?)?\s*(?:(\d+)\s*m(?:in(?:ute)?s?)?)?\s*(?:(\d+)\s*s(?:ec(?:ond)?s?)?)?$",
    )
    .expect("valid unit regex")
});

static KEY_VALUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([A-Za-z][A-Za-z _]*?)\s*[:=]\s*(.*?)\s*$").expect("valid key regex")
});

static BRACKETED_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\[[^\]]*\d[^\]]*\].*?)\s*(?:\(\d+:\d{2}(?::\d{2})?\))?\s*$")
        .expect("valid description regex")
});

static PAREN_DURATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\((\d+:\d{2}(?::\d{2})?)\)").expect("valid paren regex"));

const NAIVE_FORMATS: [&str; 5] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
];

const OFFSET_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%z"];

pub fn parse_start(value: &str) -> Option<ReportTime> {
    let token = DATETIME.find(value)?.as_str();
    if let Ok(dt) = DateTime::parse_from_rfc3339(token) {
        return Some(ReportTime::Fixed(dt));
    }
    if let Some(utc) = token.strip_suffix('Z') {
        if let Some(ReportTime::Naive(naive)) = parse_start(utc) {
            return Some(ReportTime::Fixed(naive.and_utc().fixed_offset()));
        }
    }
    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(token, fmt) {
            return Some(ReportTime::Fixed(dt));
        }
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(token, fmt).ok())
        .map(ReportTime::Naive)
}

/// Duration in whole minutes; seconds are truncated. Spans too large to add
/// to a timestamp count as unparseable.
pub fn parse_duration(value: &str) -> Option<i64> {
    let value = value.trim();
    let minutes = if let Some(caps) = CLOCK_DURATION.captures(value) {
        let first: i64 = caps[1].parse().ok()?;
        let second: i64 = caps[2].parse().ok()?;
        first.checked_mul(60)?.checked_add(second)?
    } else {
        let caps = UNIT_DURATION.captures(value)?;
        if caps.get(1).is_none() && caps.get(2).is_none() && caps.get(3).is_none() {
            return None;
        }
        let part = |i: usize| -> Option<i64> {
            caps.get(i).map_or(Some(0), |m| m.as_str().parse().ok())
        };
        let seconds = part(1)?
            .checked_mul(3600)?
            .checked_add(part(2)?.checked_mul(60)?)?
            .checked_add(part(3)?)?;
        seconds / 60
    };
    representable(minutes)
}

fn representable(minutes: i64) -> Option<i64> {
    TimeDelta::try_minutes(minutes).map(|_| minutes)
}

/// Start of `value` parsed as a datetime, ignoring datetimes later in the text.
fn leading_time(value: &str) -> Option<ReportTime> {
    DATETIME
        .find(value)
        .filter(|found| found.start() == 0)
        .and_then(|found| parse_start(found.as_str()))
}

enum Field {
    Description,
    Start,
    Stop,
    Duration,
}

fn classify(key: &str) -> Option<Field> {
    let key = key.trim().to_ascii_lowercase().replace('_', " ");
    match key.as_str() {
        "description" | "desc" | "entry" | "task" | "title" => Some(Field::Description),
        "start" | "started" | "start time" | "started at" | "start date" => Some(Field::Start),
        "stop" | "stopped" | "end" | "ended" | "stop time" | "stopped at" | "end time" => {
            Some(Field::Stop)
        }
        "duration" | "elapsed" | "total" | "time spent" | "duration time" => {
            Some(Field::Duration)
        }
        _ => None,
    }
}

/// `Key: value` lines, with loose fallbacks for one-line reports.
pub struct TextReportParser;

impl EntryReportParser for TextReportParser {
    fn name(&self) -> &'static str {
        "text"
    }

    fn parse(&self, report: &str) -> Option<EntryReport> {
        let mut entry = EntryReport::default();
        let mut stop_line = None;
        for (index, line) in report.lines().enumerate() {
            let Some(caps) = KEY_VALUE.captures(line) else {
                continue;
            };
            let value = &caps[2];
            if value.is_empty() {
                continue;
            }
            match classify(&caps[1]) {
                Some(Field::Description) if entry.description.is_none() => {
                    entry.description = Some(value.to_string());
                }
                Some(Field::Start) if entry.start.is_none() => entry.start = parse_start(value),
                // `Stopped: <entry>` is a status line, so only a leading time counts.
                Some(Field::Stop) if entry.stop.is_none() => {
                    entry.stop = leading_time(value);
                    if entry.stop.is_some() {
                        stop_line = Some(index);
                    }
                }
                Some(Field::Duration) if entry.duration_minutes.is_none() => {
                    entry.duration_minutes = parse_duration(value);
                }
                _ => {}
            }
        }

        if entry.description.is_none() {
            entry.description = report
                .lines()
                .find_map(|line| BRACKETED_LINE.captures(line))
                .map(|caps| caps[1].trim().to_string());
        }
        if entry.start.is_none() {
            entry.start = report
                .lines()
                .enumerate()
                .filter(|(index, _)| Some(*index) != stop_line)
                .find_map(|(_, line)| parse_start(line));
        }
        if entry.duration_minutes.is_none() {
            entry.duration_minutes = PAREN_DURATION
                .captures(report)
                .and_then(|caps| parse_duration(&caps[1]));
        }
        Some(entry)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawEntry {
    #[serde(alias = "desc", alias = "title")]
    description: Option<Value>,
    #[serde(alias = "started_at", alias = "start_time")]
    start: Option<Value>,
    #[serde(alias = "end", alias = "stopped_at", alias = "end_time")]
    stop: Option<Value>,
    duration: Option<Value>,
}

fn text_value(value: Option<Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    }
}

/// Seconds as a number, or any duration string the text parser accepts.
fn json_duration(value: Option<Value>) -> Option<i64> {
    match value? {
        Value::Number(n) => {
            let seconds = n.as_f64().filter(|secs| secs.is_finite())?.max(0.0);
            let minutes = (seconds / 60.0).trunc();
            if minutes >= i64::MAX as f64 {
                return None;
            }
            representable(minutes as i64)
        }
        Value::String(s) => parse_duration(&s),
        _ => None,
    }
}

/// A JSON object, optionally wrapped in `data` or `entry`.
pub struct JsonReportParser;

impl EntryReportParser for JsonReportParser {
    fn name(&self) -> &'static str {
        "json"
    }

    fn parse(&self, report: &str) -> Option<EntryReport> {
        let raw: Value = serde_json::from_str(report.trim()).ok()?;
        let obj = ["data", "entry"]
            .iter()
            .find_map(|key| raw.get(*key).filter(|inner| inner.is_object()))
            .unwrap_or(&raw);
        if !obj.is_object() {
            return None;
        }
        let entry: RawEntry = match RawEntry::deserialize(obj) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::debug!(error = %e, "JSON report has an unexpected shape");
                RawEntry::default()
            }
        };

        Some(EntryReport {
            description: text_value(entry.description),
            start: text_value(entry.start).and_then(|s| parse_start(&s)),
            stop: text_value(entry.stop).and_then(|s| parse_start(&s)),
            duration_minutes: json_duration(entry.duration),
        })
    }
}

/// Runs the known parsers in order; the first that recognises the format wins.
pub fn parse_report(report: &str) -> EntryReport {
    let parsers: [&dyn EntryReportParser; 2] = [&JsonReportParser, &TextReportParser];
    let mut entry = parsers
        .iter()
        .find_map(|parser| {
            let parsed = parser.parse(report)?;
            tracing::debug!(parser = parser.name(), ?parsed, "parsed stop report");
            Some(parsed)
        })
        .unwrap_or_default();

    if entry.duration_minutes.is_none() {
        if let (Some(start), Some(stop)) = (&entry.start, &entry.stop) {
            entry.duration_minutes = start.minutes_until(stop);
        }
    }
    entry
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn naive(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> ReportTime {
        ReportTime::Naive(
            NaiveDate::from_ymd_opt(y, mo, d)
                .unwrap()
                .and_hms_opt(h, mi, s)
                .unwrap(),
        )
    }

    #[test]
    fn duration_clock_forms() {
        assert_eq!(parse_duration("2:30:00"), Some(150));
        assert_eq!(parse_duration("0:05:59"), Some(5));
        assert_eq!(parse_duration("1:02"), Some(62));
        assert_eq!(parse_duration("02:30:00 (2.5h)"), Some(150));
    }

    #[test]
    fn duration_unit_forms() {
        assert_eq!(parse_duration("2h 30m"), Some(150));
        assert_eq!(parse_duration("2h30m15s"), Some(150));
        assert_eq!(parse_duration("150 minutes"), Some(150));
        assert_eq!(parse_duration("45 min"), Some(45));
        assert_eq!(parse_duration("1 hour 5 mins"), Some(65));
        assert_eq!(parse_duration("9000 seconds"), Some(150));
        assert_eq!(parse_duration("3h"), Some(180));
    }

    #[test]
    fn duration_overflow_is_unparseable() {
        assert_eq!(parse_duration("999999999999999999:00"), None);
        assert_eq!(parse_duration("99999999999999999999:00"), None);
        assert_eq!(parse_duration("9999999999999999h"), None);
        assert_eq!(parse_duration("999999999999999 minutes"), None);
    }

    #[test]
    fn duration_garbage() {
        assert_eq!(parse_duration(""), None);
        assert_eq!(parse_duration("a while"), None);
        assert_eq!(parse_duration("150"), None);
    }

    #[test]
    fn start_naive_forms() {
        let expected = naive(2024, 1, 15, 12, 0, 0);
        assert_eq!(parse_start("2024-01-15T12:00:00"), Some(expected));
        assert_eq!(parse_start("2024-01-15 12:00:00"), Some(expected));
        assert_eq!(parse_start("2024-01-15 12:00"), Some(expected));
        assert_eq!(parse_start("2024/01/15 12:00:00"), Some(expected));
        assert_eq!(parse_start("on 2024-01-15T12:00:00 (local)"), Some(expected));
    }

    #[test]
    fn start_with_offset() {
        let Some(ReportTime::Fixed(dt)) = parse_start("2024-01-15T04:00:00Z") else {
            panic!("expected fixed offset");
        };
        assert_eq!(dt.offset().local_minus_utc(), 0);
        let Some(ReportTime::Fixed(dt)) = parse_start("2024-01-15 12:00:00+08:00") else {
            panic!("expected fixed offset");
        };
        assert_eq!(dt.offset().local_minus_utc(), 8 * 3600);
        assert!(matches!(
            parse_start("2024-01-15 04:00Z"),
            Some(ReportTime::Fixed(_))
        ));
    }

    #[test]
    fn text_report_key_values() {
        let report = "Time entry stopped\n\
                      Description: [#12345] Fix login bug\n\
                      Start: 2024-01-15T12:00:00\n\
                      Duration: 2:30:00\n";
        let entry = parse_report(report);
        assert_eq!(entry.description.as_deref(), Some("[#12345] Fix login bug"));
        assert_eq!(entry.start, Some(naive(2024, 1, 15, 12, 0, 0)));
        assert_eq!(entry.duration_minutes, Some(150));
    }

    #[test]
    fn text_report_one_liner() {
        let report = "Stopped: [#77] Refund (1:15:00) started 2024-03-01 09:00:00\n";
        let entry = TextReportParser.parse(report).unwrap();
        assert_eq!(entry.start, Some(naive(2024, 3, 1, 9, 0, 0)));
        assert_eq!(entry.duration_minutes, Some(75));
        assert!(entry.description.unwrap().starts_with("[#77] Refund"));
    }

    #[test]
    fn text_report_duration_from_stop() {
        let report = "Description: [#1] a\nStarted at: 2024-01-15 12:00\nEnded: 2024-01-15 12:40\n";
        assert_eq!(parse_report(report).duration_minutes, Some(40));
    }

    #[test]
    fn stop_time_is_not_mistaken_for_start() {
        let report = "Description: [#1] x\nStopped at: 2024-01-15 14:30:00\nDuration: 2:30:00\n";
        let entry = parse_report(report);
        assert_eq!(entry.start, None);
        assert_eq!(entry.stop, Some(naive(2024, 1, 15, 14, 30, 0)));
        assert_eq!(entry.duration_minutes, Some(150));
    }

    #[test]
    fn plus_minutes_out_of_range() {
        let start = naive(2024, 1, 15, 12, 0, 0);
        assert_eq!(start.plus_minutes(150), Some(naive(2024, 1, 15, 14, 30, 0)));
        assert_eq!(start.plus_minutes(i64::MAX), None);
        assert_eq!(start.plus_minutes(4_000_000_000_000), None);
    }

    #[test]
    fn text_report_unrecognised() {
        let entry = parse_report("nothing running\n");
        assert!(entry.is_empty());
    }

    #[test]
    fn json_report() {
        let report = r#"{"description":"[#12345] Fix login bug","start":"2024-01-15T12:00:00","duration":9000}"#;
        let entry = JsonReportParser.parse(report).unwrap();
        assert_eq!(entry.description.as_deref(), Some("[#12345] Fix login bug"));
        assert_eq!(entry.start, Some(naive(2024, 1, 15, 12, 0, 0)));
        assert_eq!(entry.duration_minutes, Some(150));
    }

    #[test]
    fn json_report_wrapped_with_string_duration() {
        let report = r#"{"data":{"desc":"[#9] x","start":"2024-01-15T12:00:00Z","duration":"1h 5m"}}"#;
        let entry = parse_report(report);
        assert_eq!(entry.description.as_deref(), Some("[#9] x"));
        assert!(matches!(entry.start, Some(ReportTime::Fixed(_))));
        assert_eq!(entry.duration_minutes, Some(65));
    }

    #[test]
    fn json_huge_duration_is_dropped() {
        let report = r#"{"description":"[#1] x","start":"2024-01-15T12:00:00","duration":1e18}"#;
        let entry = parse_report(report);
        assert_eq!(entry.description.as_deref(), Some("[#1] x"));
        assert_eq!(entry.duration_minutes, None);
    }

    #[test]
    fn json_odd_field_types_are_skipped() {
        let report = r#"{"description":42,"start":"2024-01-15T12:00:00","duration":[1]}"#;
        let entry = JsonReportParser.parse(report).unwrap();
        assert_eq!(entry.description, None);
        assert_eq!(entry.start, Some(naive(2024, 1, 15, 12, 0, 0)));
        assert_eq!(entry.duration_minutes, None);
    }

    #[test]
    fn json_non_object_falls_back_to_text() {
        assert!(JsonReportParser.parse("[1,2]").is_none());
        assert!(JsonReportParser.parse("Description: x").is_none());
    }
}
