use chrono::{Duration, NaiveDateTime};

use super::aggregator::HealthDataAggregator;
use super::analyzer::QueryAnalyzer;
use super::format::{
    format_daily_metrics, format_events, format_summary, format_uploaded_files,
    MAX_DETAILED_EVENTS, MAX_SUMMARY_EVENTS,
};
use super::summary::{count_events, summarize};
use super::types::{
    HealthDataStore, IntentAnalyzer, RagContext, RagContextMetadata, RetrievalStrategy, TimeRange,
};
use crate::config::EngineConfig;
use crate::models::DataSourceTag;

/// Windows of at most this many days get the detailed view.
pub const DETAIL_WINDOW_DAYS: u32 = 3;
/// Fallback window when nothing in the query resolves to a time period.
pub const DEFAULT_WINDOW_DAYS: u32 = 7;

/// Detailed view for short windows, summary view otherwise.
pub fn select_strategy(range: &TimeRange, detail_window_days: u32) -> RetrievalStrategy {
    if range.span() <= Duration::days(i64::from(detail_window_days)) {
        RetrievalStrategy::Detailed
    } else {
        RetrievalStrategy::Summary
    }
}

/// Sentence substituted for the context when every source came back empty.
pub fn no_data_message(range: &TimeRange) -> String {
    format!(
        "No health data is available for {} ({} to {}). The user may not have synced their devices or uploaded records for this period yet.",
        range.description,
        range.start_date(),
        range.end_date()
    )
}

/// Per-turn context assembly.
///
/// Coordinates: analyze → resolve window → pick strategy → fetch (concurrently)
/// → render → tag. Holds no per-request state; one instance serves many
/// concurrent turns.
pub struct ContextOrchestrator<S: HealthDataStore, A: IntentAnalyzer> {
    aggregator: HealthDataAggregator<S>,
    analyzer: A,
    detail_window_days: u32,
    default_window_days: u32,
    max_detailed_events: usize,
    summary_events: usize,
}

impl<S: HealthDataStore> ContextOrchestrator<S, QueryAnalyzer> {
    /// Heuristic analysis only, default settings.
    pub fn with_store(store: S) -> Self {
        Self::new(store, QueryAnalyzer::default())
    }
}

impl<S: HealthDataStore, A: IntentAnalyzer> ContextOrchestrator<S, A> {
    pub fn new(store: S, analyzer: A) -> Self {
        Self {
            aggregator: HealthDataAggregator::new(store),
            analyzer,
            detail_window_days: DETAIL_WINDOW_DAYS,
            default_window_days: DEFAULT_WINDOW_DAYS,
            max_detailed_events: MAX_DETAILED_EVENTS,
            summary_events: MAX_SUMMARY_EVENTS,
        }
    }

    pub fn from_config(store: S, analyzer: A, config: &EngineConfig) -> Self {
        Self {
            aggregator: HealthDataAggregator::new(store)
                .with_upload_recency_months(config.upload_recency_months),
            analyzer,
            detail_window_days: config.detail_window_days,
            default_window_days: config.default_window_days,
            max_detailed_events: config.max_detailed_events,
            summary_events: config.summary_events,
        }
    }

    pub fn aggregator(&self) -> &HealthDataAggregator<S> {
        &self.aggregator
    }

    pub fn analyzer(&self) -> &A {
        &self.analyzer
    }

    /// Build the context for one chat turn against the host clock.
    pub async fn retrieve_context(&self, user_id: &str, query: &str) -> RagContext {
        self.retrieve_context_at(user_id, query, chrono::Local::now().naive_local())
            .await
    }

    /// Build the context for one chat turn against an explicit `now`.
    ///
    /// Never fails: source errors degrade to empty sources, and a turn with
    /// no data at all yields an explanatory sentence instead of empty text.
    pub async fn retrieve_context_at(
        &self,
        user_id: &str,
        query: &str,
        now: NaiveDateTime,
    ) -> RagContext {
        let analysis = self.analyzer.analyze_intent(query, now).await;

        if !analysis.needs_health_data {
            tracing::debug!(user_id, "Query does not need health data");
            return RagContext::empty();
        }

        let range = analysis
            .time_range
            .clone()
            .unwrap_or_else(|| TimeRange::default_window(now, self.default_window_days));
        let strategy = select_strategy(&range, self.detail_window_days);

        tracing::debug!(
            user_id,
            window = %range.description,
            strategy = ?strategy,
            metrics = analysis.metrics.len(),
            "Retrieving health context"
        );

        let sections = match strategy {
            RetrievalStrategy::Detailed => self.detailed_view(user_id, &range).await,
            RetrievalStrategy::Summary => self.summary_view(user_id, &range).await,
        };

        let mut blocks = Vec::new();
        let mut data_types = Vec::new();
        for (tag, text) in sections {
            if !text.is_empty() {
                blocks.push(text);
                data_types.push(tag);
            }
        }

        let data_retrieved = !blocks.is_empty();
        let health_context = if data_retrieved {
            format!(
                "TIME PERIOD: {} ({} to {})\n\n{}",
                range.description,
                range.start_date(),
                range.end_date(),
                blocks.join("\n\n")
            )
        } else {
            tracing::debug!(user_id, window = %range.description, "No health data in window");
            no_data_message(&range)
        };

        RagContext {
            has_health_data: true,
            health_context,
            metadata: RagContextMetadata {
                data_retrieved,
                time_range: Some(range),
                metrics_included: analysis.metrics,
                data_types,
            },
        }
    }

    /// Per-day rows, up to `max_detailed_events` events, and uploads.
    async fn detailed_view(&self, user_id: &str, range: &TimeRange) -> Vec<(DataSourceTag, String)> {
        let (daily, events, uploads) = tokio::join!(
            self.aggregator
                .fetch_daily_metrics(user_id, range.start, range.end),
            self.aggregator
                .fetch_events(user_id, range.start, range.end, None),
            self.aggregator
                .fetch_uploaded_entries(user_id, range.start, range.end, None),
        );

        vec![
            (DataSourceTag::DailyMetrics, format_daily_metrics(&daily.data)),
            (
                DataSourceTag::HealthEvents,
                format_events(&events.data, self.max_detailed_events),
            ),
            (DataSourceTag::UploadedFiles, format_uploaded_files(&uploads.data)),
        ]
    }

    /// Period summary with event counts, the most recent `summary_events`
    /// events, and uploads.
    async fn summary_view(&self, user_id: &str, range: &TimeRange) -> Vec<(DataSourceTag, String)> {
        let (daily, events, uploads) = tokio::join!(
            self.aggregator
                .fetch_daily_metrics(user_id, range.start, range.end),
            self.aggregator
                .fetch_events(user_id, range.start, range.end, None),
            self.aggregator
                .fetch_uploaded_entries(user_id, range.start, range.end, None),
        );

        let summary_text = summarize(&daily.data)
            .map(|mut summary| {
                summary.events = count_events(&events.data);
                format_summary(&summary)
            })
            .unwrap_or_default();

        vec![
            (DataSourceTag::Summary, summary_text),
            (
                DataSourceTag::HealthEvents,
                format_events(&events.data, self.summary_events),
            ),
            (DataSourceTag::UploadedFiles, format_uploaded_files(&uploads.data)),
        ]
    }
}
