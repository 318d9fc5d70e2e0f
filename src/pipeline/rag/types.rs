use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::RagError;
use crate::db::DatabaseError;
use crate::models::*;

/// A resolved time window, in host-local naive time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeRange {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub description: String,
}

impl TimeRange {
    /// Build a range, swapping the bounds if they arrive reversed so that
    /// `start <= end` always holds.
    pub fn new(start: NaiveDateTime, end: NaiveDateTime, description: impl Into<String>) -> Self {
        let (start, end) = if start <= end { (start, end) } else { (end, start) };
        Self {
            start,
            end,
            description: description.into(),
        }
    }

    /// The fallback window used when a query carries no time reference.
    pub fn default_window(now: NaiveDateTime, days: u32) -> Self {
        Self::new(
            now - Duration::days(i64::from(days)),
            now,
            format!("last {days} days (default)"),
        )
    }

    pub fn span(&self) -> Duration {
        self.end - self.start
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start.date()
    }

    pub fn end_date(&self) -> NaiveDate {
        self.end.date()
    }
}

/// Structured intent parsed from a raw chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryAnalysis {
    pub needs_health_data: bool,
    pub time_range: Option<TimeRange>,
    /// Canonical order, no duplicates.
    pub metrics: Vec<MetricKey>,
    pub raw_query: String,
}

impl QueryAnalysis {
    pub fn not_health_related(raw_query: &str) -> Self {
        Self {
            needs_health_data: false,
            time_range: None,
            metrics: Vec::new(),
            raw_query: raw_query.to_string(),
        }
    }

    /// Missing a time window or any metric: worth asking the generator.
    pub fn is_ambiguous(&self) -> bool {
        self.time_range.is_none() || self.metrics.is_empty()
    }
}

/// Outcome of one datastore read. Failures are carried, never raised.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceFetch<T> {
    pub success: bool,
    pub data: Vec<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> SourceFetch<T> {
    pub fn ok(data: Vec<T>) -> Self {
        Self {
            success: true,
            data,
            error: None,
        }
    }

    pub fn failed(error: impl std::fmt::Display) -> Self {
        Self {
            success: false,
            data: Vec::new(),
            error: Some(error.to_string()),
        }
    }
}

impl<T> From<Result<Vec<T>, DatabaseError>> for SourceFetch<T> {
    fn from(result: Result<Vec<T>, DatabaseError>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(e) => Self::failed(e),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryDateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Number of daily rows the summary was built from.
    pub days: usize,
}

/// Per-request rollup of the daily rows in a window. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSummary {
    pub date_range: SummaryDateRange,
    pub averages: BTreeMap<MetricKey, f64>,
    pub totals: BTreeMap<MetricKey, f64>,
    /// Event type -> count.
    pub events: BTreeMap<String, usize>,
    pub latest_weight: Option<f64>,
}

/// Which shape of data the orchestrator retrieves for a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RetrievalStrategy {
    /// Per-day rows plus events, for short windows.
    Detailed,
    /// Aggregated summary plus the most recent events, for long windows.
    Summary,
}

/// What informed a reply. Persisted by the caller next to the generated message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RagContextMetadata {
    pub data_retrieved: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_range: Option<TimeRange>,
    pub metrics_included: Vec<MetricKey>,
    pub data_types: Vec<DataSourceTag>,
}

impl RagContextMetadata {
    /// The message-metadata object stored with the reply: `{"ragContext": {...}}`.
    pub fn message_metadata(&self) -> serde_json::Value {
        serde_json::json!({ "ragContext": self })
    }
}

/// The engine's per-turn output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RagContext {
    pub has_health_data: bool,
    pub health_context: String,
    pub metadata: RagContextMetadata,
}

impl RagContext {
    /// Returned when the query does not call for personal data.
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Read-only access to a user's health records.
///
/// Every method is scoped by `user_id`; implementations must not return
/// another user's rows.
#[async_trait]
pub trait HealthDataStore: Send + Sync {
    /// Daily rollups whose date falls within `[start, end]` (by calendar date).
    async fn daily_metrics(
        &self,
        user_id: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<DailyMetric>, DatabaseError>;

    /// Events starting within `[start, end]`, optionally restricted to `types`.
    async fn health_events(
        &self,
        user_id: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
        types: Option<&[String]>,
    ) -> Result<Vec<HealthEvent>, DatabaseError>;

    /// Uploaded files, with entries, that can matter for `[start, end]`: no
    /// declared range, a declared range overlapping the window by calendar
    /// date, or uploaded at or after `uploaded_since` (`None` keeps all).
    async fn uploaded_files(
        &self,
        user_id: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
        uploaded_since: Option<NaiveDateTime>,
    ) -> Result<Vec<UploadedFile>, DatabaseError>;
}

/// Text generation capability: given a prompt, return a completion.
#[async_trait]
pub trait LlmGenerate: Send + Sync {
    async fn generate(&self, system: &str, prompt: &str) -> Result<String, RagError>;
}

#[async_trait]
impl<T: LlmGenerate + ?Sized> LlmGenerate for std::sync::Arc<T> {
    async fn generate(&self, system: &str, prompt: &str) -> Result<String, RagError> {
        (**self).generate(system, prompt).await
    }
}

/// Turns a raw query into a `QueryAnalysis`, possibly with outside help.
#[async_trait]
pub trait IntentAnalyzer: Send + Sync {
    async fn analyze_intent(&self, query: &str, now: NaiveDateTime) -> QueryAnalysis;
}
