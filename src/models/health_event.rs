use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A discrete timestamped occurrence: a workout, a meal, a measurement session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthEvent {
    pub id: Uuid,
    pub user_id: String,
    /// Open vocabulary ("workout", "meal", ...), compared verbatim by filters.
    pub event_type: String,
    pub title: String,
    pub description: Option<String>,
    pub start_time: NaiveDateTime,
    pub end_time: Option<NaiveDateTime>,
    pub duration_minutes: Option<f64>,
    pub metrics: BTreeMap<String, serde_json::Value>,
}

impl HealthEvent {
    /// Explicit duration, else derived from `end_time`.
    pub fn effective_duration_minutes(&self) -> Option<f64> {
        self.duration_minutes.or_else(|| {
            self.end_time
                .map(|end| (end - self.start_time).num_seconds() as f64 / 60.0)
                .filter(|m| *m > 0.0)
        })
    }
}
