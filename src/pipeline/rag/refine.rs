//! Optional generator-assisted refinement of a weak local analysis.
//!
//! `RefiningAnalyzer` decorates `QueryAnalyzer`. When the local result needs
//! health data but lacks a time window or metrics, it asks the generator for
//! a small JSON classification and merges it in. Any failure (transport,
//! timeout, unparseable output) falls back to the local result unchanged.

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::Deserialize;

use super::analyzer::QueryAnalyzer;
use super::types::{IntentAnalyzer, LlmGenerate, QueryAnalysis};
use super::RagError;
use crate::config::EngineConfig;
use crate::models::MetricKey;

pub const REFINEMENT_SYSTEM_PROMPT: &str = "You classify questions sent to a personal wellness assistant. \
Reply with exactly one JSON object and nothing else.";

/// The JSON object the generator is asked to return.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Refinement {
    pub needs_health_data: Option<bool>,
    pub time_reference: Option<String>,
    #[serde(default)]
    pub metrics: Vec<String>,
}

/// Build the bounded instruction prompt for one query.
pub fn build_refinement_prompt(query: &str) -> String {
    let metric_ids = MetricKey::ALL
        .iter()
        .map(|k| k.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "Question: \"{query}\"\n\n\
         Decide whether answering needs the user's own health data, which time period \
         it refers to, and which metrics are relevant.\n\
         Respond with JSON of this exact shape:\n\
         {{\"needsHealthData\": true|false, \"timeReference\": \"<phrase such as 'last week', \
         'last 3 days', 'this month'>\" or null, \"metrics\": [<zero or more of: {metric_ids}>]}}"
    )
}

/// Parse generator output, tolerating markdown fences and surrounding prose.
pub fn parse_refinement(raw: &str) -> Result<Refinement, RagError> {
    let stripped = strip_code_fences(raw);

    let start = stripped
        .find('{')
        .ok_or_else(|| RagError::RefinementParsing("no JSON object found".into()))?;
    let end = stripped
        .rfind('}')
        .filter(|end| *end > start)
        .ok_or_else(|| RagError::RefinementParsing("unterminated JSON object".into()))?;

    serde_json::from_str(&stripped[start..=end])
        .map_err(|e| RagError::RefinementParsing(e.to_string()))
}

fn strip_code_fences(raw: &str) -> String {
    raw.lines()
        .filter(|line| !line.trim_start().starts_with("```"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Merge a refinement into the local analysis.
///
/// The local time window is exact and always wins; the refinement's
/// reference is only parsed when the local parse found nothing. Refined
/// metrics replace the local list only when at least one is recognised.
pub fn merge_refinement(
    local: QueryAnalysis,
    refinement: Refinement,
    base: &QueryAnalyzer,
    now: NaiveDateTime,
) -> QueryAnalysis {
    if refinement.needs_health_data == Some(false) {
        return QueryAnalysis::not_health_related(&local.raw_query);
    }

    let time_range = local.time_range.or_else(|| {
        refinement
            .time_reference
            .as_deref()
            .and_then(|reference| base.parse_time_reference(reference, now))
    });

    let mut refined_metrics: Vec<MetricKey> = refinement
        .metrics
        .iter()
        .filter_map(|m| MetricKey::from_id(m.trim().to_lowercase().as_str()))
        .collect();
    refined_metrics.sort();
    refined_metrics.dedup();

    let metrics = if refined_metrics.is_empty() {
        local.metrics
    } else {
        refined_metrics
    };

    QueryAnalysis {
        needs_health_data: true,
        time_range,
        metrics,
        raw_query: local.raw_query,
    }
}

/// Decorator adding best-effort refinement on top of `QueryAnalyzer`.
pub struct RefiningAnalyzer<G: LlmGenerate> {
    base: QueryAnalyzer,
    generator: G,
    timeout: Duration,
    enabled: bool,
}

impl<G: LlmGenerate> RefiningAnalyzer<G> {
    pub fn new(base: QueryAnalyzer, generator: G, timeout: Duration) -> Self {
        Self {
            base,
            generator,
            timeout,
            enabled: true,
        }
    }

    /// Timeout and on/off switch taken from `EngineConfig`.
    pub fn from_config(base: QueryAnalyzer, generator: G, config: &EngineConfig) -> Self {
        Self::new(
            base,
            generator,
            Duration::from_secs(config.ollama_timeout_secs),
        )
        .with_enabled(config.refinement_enabled)
    }

    /// Turn refinement on or off without changing the analyzer's type.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn base(&self) -> &QueryAnalyzer {
        &self.base
    }

    async fn refine(&self, query: &str) -> Result<Refinement, RagError> {
        let prompt = build_refinement_prompt(query);
        let raw = tokio::time::timeout(
            self.timeout,
            self.generator.generate(REFINEMENT_SYSTEM_PROMPT, &prompt),
        )
        .await
        .map_err(|_| {
            RagError::HttpClient(format!(
                "refinement timed out after {}ms",
                self.timeout.as_millis()
            ))
        })??;
        parse_refinement(&raw)
    }
}

#[async_trait]
impl<G: LlmGenerate> IntentAnalyzer for RefiningAnalyzer<G> {
    async fn analyze_intent(&self, query: &str, now: NaiveDateTime) -> QueryAnalysis {
        let local = self.base.analyze_at(query, now);

        if !self.enabled || !local.needs_health_data || !local.is_ambiguous() {
            return local;
        }

        match self.refine(query).await {
            Ok(refinement) => {
                tracing::debug!(
                    time_reference = ?refinement.time_reference,
                    metrics = refinement.metrics.len(),
                    "Applying query refinement"
                );
                merge_refinement(local, refinement, &self.base, now)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Query refinement failed; using local analysis");
                local
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use chrono::NaiveDate;

    use super::*;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 14)
            .unwrap()
            .and_hms_opt(15, 30, 0)
            .unwrap()
    }

    enum Reply {
        Text(&'static str),
        Fail,
        Hang,
    }

    struct MockLlm {
        reply: Reply,
        calls: Arc<AtomicUsize>,
    }

    impl MockLlm {
        fn new(reply: Reply) -> (Self, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            (
                Self {
                    reply,
                    calls: calls.clone(),
                },
                calls,
            )
        }
    }

    #[async_trait]
    impl LlmGenerate for MockLlm {
        async fn generate(&self, _system: &str, _prompt: &str) -> Result<String, RagError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.reply {
                Reply::Text(t) => Ok(t.to_string()),
                Reply::Fail => Err(RagError::OllamaConnection("refused".into())),
                Reply::Hang => {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                    Ok(String::new())
                }
            }
        }
    }

    fn refining(reply: Reply) -> (RefiningAnalyzer<MockLlm>, Arc<AtomicUsize>) {
        let (llm, calls) = MockLlm::new(reply);
        (
            RefiningAnalyzer::new(QueryAnalyzer::default(), llm, Duration::from_millis(200)),
            calls,
        )
    }

    #[test]
    fn parses_fenced_json() {
        let raw = "```json\n{\"needsHealthData\": true, \"timeReference\": \"last week\", \"metrics\": [\"steps\"]}\n```";
        let r = parse_refinement(raw).unwrap();
        assert_eq!(r.needs_health_data, Some(true));
        assert_eq!(r.time_reference.as_deref(), Some("last week"));
        assert_eq!(r.metrics, vec!["steps"]);
    }

    #[test]
    fn parses_json_wrapped_in_prose() {
        let raw = "Sure! Here you go: {\"needsHealthData\": true, \"timeReference\": null, \"metrics\": []} Hope that helps.";
        let r = parse_refinement(raw).unwrap();
        assert_eq!(r.time_reference, None);
        assert!(r.metrics.is_empty());
    }

    #[test]
    fn rejects_non_json() {
        assert!(matches!(
            parse_refinement("I think it's about sleep."),
            Err(RagError::RefinementParsing(_))
        ));
        assert!(parse_refinement("{ not json }").is_err());
    }

    #[test]
    fn prompt_lists_every_metric_id() {
        let prompt = build_refinement_prompt("how am I doing?");
        for key in MetricKey::ALL {
            assert!(prompt.contains(key.as_str()));
        }
        assert!(prompt.contains("timeReference"));
    }

    #[test]
    fn merge_prefers_local_time_range() {
        let base = QueryAnalyzer::default();
        let local = base.analyze_at("how did I sleep yesterday", now());
        let refinement = Refinement {
            needs_health_data: Some(true),
            time_reference: Some("last month".into()),
            metrics: vec![],
        };
        let merged = merge_refinement(local, refinement, &base, now());
        assert_eq!(merged.time_range.unwrap().description, "yesterday");
        assert_eq!(merged.metrics, vec![MetricKey::SleepHours]);
    }

    #[test]
    fn merge_uses_refined_time_when_local_missing() {
        let base = QueryAnalyzer::default();
        let local = base.analyze_at("How has my sleep been going?", now());
        assert!(local.time_range.is_none());
        let refinement = Refinement {
            needs_health_data: Some(true),
            time_reference: Some("last 2 weeks".into()),
            metrics: vec!["deep_sleep_hours".into(), "sleep_hours".into(), "bogus".into()],
        };
        let merged = merge_refinement(local, refinement, &base, now());
        assert_eq!(merged.time_range.unwrap().description, "last 2 weeks");
        assert_eq!(
            merged.metrics,
            vec![MetricKey::SleepHours, MetricKey::DeepSleepHours]
        );
    }

    #[test]
    fn merge_keeps_local_metrics_when_refined_unrecognised() {
        let base = QueryAnalyzer::default();
        let local = base.analyze_at("How much protein did I eat?", now());
        let expected = local.metrics.clone();
        let refinement = Refinement {
            needs_health_data: None,
            time_reference: None,
            metrics: vec!["macros".into()],
        };
        let merged = merge_refinement(local, refinement, &base, now());
        assert_eq!(merged.metrics, expected);
        assert!(merged.needs_health_data);
    }

    #[test]
    fn merge_honours_explicit_not_needed() {
        let base = QueryAnalyzer::default();
        let local = base.analyze_at("What is a good weekly routine for beginners?", now());
        let refinement = Refinement {
            needs_health_data: Some(false),
            ..Default::default()
        };
        let merged = merge_refinement(local, refinement, &base, now());
        assert!(!merged.needs_health_data);
    }

    #[tokio::test]
    async fn unambiguous_query_skips_generator() {
        let (analyzer, calls) = refining(Reply::Text("{}"));
        let analysis = analyzer
            .analyze_intent("How many steps did I take yesterday?", now())
            .await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(analysis.time_range.unwrap().description, "yesterday");
    }

    #[tokio::test]
    async fn non_health_query_skips_generator() {
        let (analyzer, calls) = refining(Reply::Text("{}"));
        let analysis = analyzer.analyze_intent("Hello, how are you?", now()).await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(!analysis.needs_health_data);
    }

    #[tokio::test]
    async fn ambiguous_query_is_refined() {
        let (analyzer, calls) = refining(Reply::Text(
            "```json\n{\"needsHealthData\": true, \"timeReference\": \"this month\", \"metrics\": [\"workouts\"]}\n```",
        ));
        let analysis = analyzer
            .analyze_intent("How consistent have I been with the plan?", now())
            .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(analysis.time_range.unwrap().description, "this month");
        assert_eq!(analysis.metrics, vec![MetricKey::Workouts]);
    }

    #[tokio::test]
    async fn disabled_by_config_never_calls_generator() {
        let (llm, calls) = MockLlm::new(Reply::Text("{}"));
        let config = EngineConfig {
            refinement_enabled: false,
            ..EngineConfig::default()
        };
        let analyzer = RefiningAnalyzer::from_config(QueryAnalyzer::default(), llm, &config);
        let query = "How has my sleep been going?";
        let analysis = analyzer.analyze_intent(query, now()).await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(analysis, analyzer.base().analyze_at(query, now()));
    }

    #[tokio::test]
    async fn generator_failure_falls_back_to_local() {
        let (analyzer, calls) = refining(Reply::Fail);
        let query = "How has my sleep been going?";
        let analysis = analyzer.analyze_intent(query, now()).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(analysis, QueryAnalyzer::default().analyze_at(query, now()));
    }

    #[tokio::test]
    async fn garbage_output_falls_back_to_local() {
        let (analyzer, _) = refining(Reply::Text("no idea, sorry"));
        let query = "How has my sleep been going?";
        let analysis = analyzer.analyze_intent(query, now()).await;
        assert_eq!(analysis, QueryAnalyzer::default().analyze_at(query, now()));
    }

    #[tokio::test]
    async fn timeout_falls_back_to_local() {
        let (analyzer, _) = refining(Reply::Hang);
        let query = "How has my sleep been going?";
        let analysis = analyzer.analyze_intent(query, now()).await;
        assert_eq!(analysis, QueryAnalyzer::default().analyze_at(query, now()));
    }

    #[tokio::test]
    async fn disabled_refinement_never_calls_generator() {
        let (analyzer, calls) = refining(Reply::Text("{}"));
        let analyzer = analyzer.with_enabled(false);
        analyzer
            .analyze_intent("How has my sleep been going?", now())
            .await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
