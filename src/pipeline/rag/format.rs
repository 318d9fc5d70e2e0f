//! Deterministic text renderers for retrieved health data.
//!
//! Every renderer returns an empty string when it has nothing to say, so the
//! orchestrator can tell which sources actually produced output.

use std::collections::BTreeMap;

use super::types::DataSummary;
use crate::models::{DailyMetric, HealthEvent, MetricKey, UploadedFile};

/// Default number of events rendered in the detailed view.
pub const MAX_DETAILED_EVENTS: usize = 20;
/// Default number of events rendered alongside a summary.
pub const MAX_SUMMARY_EVENTS: usize = 10;

/// Render one line per day, skipping days with no recorded values.
pub fn format_daily_metrics(metrics: &[DailyMetric]) -> String {
    let lines: Vec<String> = metrics
        .iter()
        .filter(|m| !m.is_empty())
        .map(|m| {
            let values = MetricKey::ALL
                .iter()
                .filter_map(|k| m.value(*k).map(|v| format_metric(*k, v)))
                .collect::<Vec<_>>()
                .join(", ");
            format!("- {} ({}): {values}", m.date, m.date.format("%A"))
        })
        .collect();

    if lines.is_empty() {
        return String::new();
    }

    format!("DAILY METRICS:\n{}", lines.join("\n"))
}

/// Render a period summary: averages, totals, latest weight, event counts.
pub fn format_summary(summary: &DataSummary) -> String {
    if summary.averages.is_empty() && summary.events.is_empty() && summary.latest_weight.is_none()
    {
        return String::new();
    }

    let range = &summary.date_range;
    let mut lines = vec![format!(
        "SUMMARY ({} to {}, {} {} with data):",
        range.start,
        range.end,
        range.days,
        if range.days == 1 { "day" } else { "days" }
    )];

    if !summary.averages.is_empty() {
        lines.push(format!("Daily averages: {}", format_metric_map(&summary.averages)));
    }
    if !summary.totals.is_empty() {
        lines.push(format!("Totals: {}", format_metric_map(&summary.totals)));
    }
    if let Some(weight) = summary.latest_weight {
        lines.push(format!("Latest weight: {}", format_metric(MetricKey::Weight, weight)));
    }
    if !summary.events.is_empty() {
        let counts = summary
            .events
            .iter()
            .map(|(event_type, count)| format!("{event_type} x{count}"))
            .collect::<Vec<_>>()
            .join(", ");
        lines.push(format!("Event counts: {counts}"));
    }

    lines.join("\n")
}

/// Render the most recent `limit` events.
///
/// Expects newest-first input, as returned by the aggregator.
pub fn format_events(events: &[HealthEvent], limit: usize) -> String {
    if events.is_empty() {
        return String::new();
    }

    let shown = &events[..events.len().min(limit)];

    let header = if shown.len() < events.len() {
        format!(
            "HEALTH EVENTS (most recent {} of {}):",
            shown.len(),
            events.len()
        )
    } else {
        "HEALTH EVENTS:".to_string()
    };

    let lines = shown.iter().map(format_event).collect::<Vec<_>>().join("\n");
    format!("{header}\n{lines}")
}

fn format_event(event: &HealthEvent) -> String {
    let mut line = format!(
        "- {} [{}] {}",
        event.start_time.format("%Y-%m-%d %H:%M"),
        event.event_type,
        event.title
    );
    if let Some(minutes) = event.effective_duration_minutes() {
        line.push_str(&format!(" ({} min)", format_number(minutes)));
    }
    if !event.metrics.is_empty() {
        line.push_str(&format!(": {}", format_open_metrics(&event.metrics)));
    }
    if let Some(description) = event.description.as_deref().filter(|d| !d.trim().is_empty()) {
        line.push_str(&format!(" | {}", description.trim()));
    }
    line
}

/// Render every entry of every file.
pub fn format_uploaded_files(files: &[UploadedFile]) -> String {
    let blocks: Vec<String> = files.iter().map(format_uploaded_file).collect();
    if blocks.is_empty() {
        return String::new();
    }
    format!("UPLOADED DOCUMENTS:\n{}", blocks.join("\n\n"))
}

fn format_uploaded_file(file: &UploadedFile) -> String {
    let mut header = format!(
        "File: {} (uploaded {}",
        file.file_name,
        file.uploaded_at.format("%Y-%m-%d")
    );
    if let Some(range) = &file.date_range {
        header.push_str(&format!("; covers {} to {}", range.start, range.end));
    }
    if !file.categories.is_empty() {
        header.push_str(&format!("; categories: {}", file.categories.join(", ")));
    }
    header.push(')');

    let mut lines = vec![header];
    if let Some(summary) = file.summary.as_deref().filter(|s| !s.trim().is_empty()) {
        lines.push(format!("Summary: {}", summary.trim()));
    }

    for entry in &file.entries {
        let date = entry
            .date
            .map(|d| d.to_string())
            .unwrap_or_else(|| "undated".to_string());
        let mut line = format!("- {date}");
        if !entry.metrics.is_empty() {
            line.push_str(&format!(": {}", format_open_metrics(&entry.metrics)));
        }
        if let Some(notes) = entry.notes.as_deref().filter(|n| !n.trim().is_empty()) {
            line.push_str(&format!(" | notes: {}", notes.trim()));
        }
        lines.push(line);
    }

    lines.join("\n")
}

fn format_metric_map(values: &BTreeMap<MetricKey, f64>) -> String {
    values
        .iter()
        .map(|(k, v)| format_metric(*k, *v))
        .collect::<Vec<_>>()
        .join(", ")
}

fn format_open_metrics(metrics: &BTreeMap<String, serde_json::Value>) -> String {
    metrics
        .iter()
        .map(|(name, value)| {
            let rendered = match value {
                serde_json::Value::Number(n) => n
                    .as_f64()
                    .map(format_number)
                    .unwrap_or_else(|| n.to_string()),
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            format!("{name} {rendered}")
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn format_metric(key: MetricKey, value: f64) -> String {
    let unit = key.unit();
    if unit.is_empty() {
        format!("{} {}", key.label(), format_number(value))
    } else {
        format!("{} {} {unit}", key.label(), format_number(value))
    }
}

/// Integers without decimals, everything else with at most two.
pub(crate) fn format_number(value: f64) -> String {
    if (value - value.round()).abs() < 1e-9 {
        return format!("{value:.0}");
    }
    let s = format!("{value:.2}");
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}
