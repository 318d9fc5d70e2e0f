use std::collections::BTreeMap;

use super::types::{DataSummary, SummaryDateRange};
use crate::models::{DailyMetric, HealthEvent, MetricKey};

/// Aggregate daily rows into averages, totals and the latest weight.
///
/// Each field is averaged over the rows where it is present; absent values
/// never count as zero. Returns `None` for an empty slice.
pub fn summarize(metrics: &[DailyMetric]) -> Option<DataSummary> {
    let start = metrics.iter().map(|m| m.date).min()?;
    let end = metrics.iter().map(|m| m.date).max()?;

    let mut averages = BTreeMap::new();
    let mut totals = BTreeMap::new();

    for key in MetricKey::ALL {
        let values: Vec<f64> = metrics.iter().filter_map(|m| m.value(key)).collect();
        if values.is_empty() {
            continue;
        }
        let sum: f64 = values.iter().sum();
        averages.insert(key, round2(sum / values.len() as f64));
        if key.is_cumulative() {
            totals.insert(key, round2(sum));
        }
    }

    let latest_weight = metrics
        .iter()
        .filter(|m| m.weight_kg.is_some())
        .max_by_key(|m| m.date)
        .and_then(|m| m.weight_kg);

    Some(DataSummary {
        date_range: SummaryDateRange {
            start,
            end,
            days: metrics.len(),
        },
        averages,
        totals,
        events: BTreeMap::new(),
        latest_weight,
    })
}

/// Count events per type.
pub fn count_events(events: &[HealthEvent]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for event in events {
        *counts.entry(event.event_type.clone()).or_insert(0) += 1;
    }
    counts
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
