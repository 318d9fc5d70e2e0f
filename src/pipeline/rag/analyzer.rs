use async_trait::async_trait;
use chrono::NaiveDateTime;

use super::types::{IntentAnalyzer, QueryAnalysis, TimeRange};
use super::vocabulary::Vocabulary;
use crate::models::MetricKey;

/// Heuristic query intent analyzer.
///
/// Pure and deterministic for a given vocabulary and `now`: no I/O, no
/// hidden state.
#[derive(Debug, Clone, Default)]
pub struct QueryAnalyzer {
    vocabulary: Vocabulary,
}

impl QueryAnalyzer {
    pub fn new(vocabulary: Vocabulary) -> Self {
        Self { vocabulary }
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    /// Analyze against the host clock.
    pub fn analyze(&self, query: &str) -> QueryAnalysis {
        self.analyze_at(query, chrono::Local::now().naive_local())
    }

    /// Analyze against an explicit `now`.
    pub fn analyze_at(&self, query: &str, now: NaiveDateTime) -> QueryAnalysis {
        let lower = query.to_lowercase();

        if !self.needs_health_data(&lower) {
            return QueryAnalysis::not_health_related(query);
        }

        QueryAnalysis {
            needs_health_data: true,
            time_range: self.parse_time_reference(&lower, now),
            metrics: self.extract_metrics(&lower),
            raw_query: query.to_string(),
        }
    }

    /// Keyword hit, or a long enough question/request.
    pub fn needs_health_data(&self, lower: &str) -> bool {
        if self
            .vocabulary
            .health_keywords
            .iter()
            .any(|k| lower.contains(k.as_str()))
        {
            return true;
        }

        let trimmed = lower.trim();
        let first_word = trimmed
            .split_whitespace()
            .next()
            .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric() && c != '\''))
            .unwrap_or("");

        let is_question = self
            .vocabulary
            .question_starters
            .iter()
            .any(|s| s == first_word);

        is_question && trimmed.chars().count() > self.vocabulary.min_question_chars
    }

    /// Every metric whose synonym pattern matches, in canonical order.
    pub fn extract_metrics(&self, lower: &str) -> Vec<MetricKey> {
        let mut metrics = Vec::new();
        for (key, pattern) in &self.vocabulary.metric_patterns {
            if pattern.is_match(lower) && !metrics.contains(key) {
                metrics.push(*key);
            }
        }
        metrics
    }

    /// Resolve a time phrase with this analyzer's time vocabulary.
    pub fn parse_time_reference(&self, text: &str, now: NaiveDateTime) -> Option<TimeRange> {
        self.vocabulary.time.parse(text, now)
    }
}

#[async_trait]
impl IntentAnalyzer for QueryAnalyzer {
    async fn analyze_intent(&self, query: &str, now: NaiveDateTime) -> QueryAnalysis {
        self.analyze_at(query, now)
    }
}
