use crate::summary::{PartialSummary, Summary};

pub fn format_duration(minutes: i64) -> String {
    let minutes = minutes.max(0);
    format!("{}h {}m", minutes / 60, minutes % 60)
}

pub fn summary_line(summary: &Summary) -> String {
    format!(
        "[{} - {}, {}] - {} - {}",
        format_duration(summary.duration_minutes),
        summary.timestamp,
        summary.support_name,
        summary.ticket_url,
        summary.subject,
    )
}

/// Same layout as [`summary_line`] with `?` standing in for missing fields.
pub fn partial_summary_line(partial: &PartialSummary) -> String {
    let unknown = || "?".to_string();
    format!(
        "[{} - {}, {}] - {} - {}",
        partial
            .duration_minutes
            .map(format_duration)
            .unwrap_or_else(unknown),
        partial.timestamp.clone().unwrap_or_else(unknown),
        partial.support_name,
        partial.ticket_url.clone().unwrap_or_else(unknown),
        partial.subject.clone().unwrap_or_else(unknown),
    )
}
