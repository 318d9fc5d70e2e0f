//! Keyword, synonym and time-phrase tables driving the query analyzer.
//!
//! The tables are plain data handed to `QueryAnalyzer::new`, so a caller can
//! swap vocabularies without touching process-wide state.

use std::sync::LazyLock;

use regex::Regex;

use super::time_range::TimeVocabulary;
use crate::models::MetricKey;

/// Substrings that mark a query as needing personal data.
const HEALTH_KEYWORDS: &[&str] = &[
    // Metric names
    "step", "walk", "distance", "mile", "calorie", "active", "activity",
    "heart", "pulse", "bpm", "hrv", "resting", "sleep", "slept",
    "weight", "weigh", "bmi", "body fat", "protein", "carb", "diet",
    "nutrition", "water", "hydrat", "workout", "exercise", "training", "gym",
    "running", "cycling", "swim", "yoga",
    // Lab and biomarker terms
    "lab result", "labs", "blood", "cholesterol", "ldl", "hdl", "triglycer", "glucose",
    "a1c", "vitamin", "biomarker", "test result", "ferritin", "thyroid",
    // Analytical verbs
    "average", "trend", "total", "progress", "compare", "improve", "stats",
    "statistic", "my data", "metric", "how much", "how many",
    // Time words
    "today", "yesterday", "tonight", "last night", "this morning", "week",
    "month", "recently", "lately",
];

/// Leading words of questions and requests.
const QUESTION_STARTERS: &[&str] = &[
    "how", "what", "what's", "whats", "did", "do", "does", "show", "when",
    "was", "were", "am", "is", "are", "tell", "give", "can", "could",
    "have", "has", "should", "compare", "summarize", "summarise", "why",
    "which", "list",
];

/// Questions shorter than this need a keyword to count as health-related.
const MIN_QUESTION_CHARS: usize = 20;

/// Synonym patterns per metric, matched against the lowercased query.
const METRIC_PATTERNS: &[(MetricKey, &str)] = &[
    (MetricKey::Steps, r"\bsteps?\b|\bwalk(?:s|ed|ing)?\b|step count"),
    (MetricKey::Distance, r"\bdistance\b|\bmiles?\b|\bkilomet(?:er|re)s?\b|\bkm\b|how far"),
    (
        MetricKey::ActiveCalories,
        r"active calories|calories burn(?:ed|t)|burn(?:ed|t)? (?:any )?calories",
    ),
    (MetricKey::ActiveMinutes, r"active minutes|\bactive\b|\bactivity\b|move minutes"),
    (MetricKey::RestingHeartRate, r"resting heart|\brhr\b|resting (?:pulse|hr)\b"),
    (MetricKey::HeartRate, r"heart ?rate|\bpulse\b|\bbpm\b|\bheart\b"),
    (MetricKey::HeartRateVariability, r"\bhrv\b|heart rate variability"),
    (MetricKey::SleepHours, r"\bsleep\w*|\bslept\b|\bnaps?\b|bed ?time"),
    (MetricKey::DeepSleepHours, r"deep sleep|sleep stages?|\brem\b"),
    (MetricKey::Weight, r"\bweigh\w*|\bkg\b|\blbs?\b|\bpounds?\b"),
    (MetricKey::BodyFat, r"body fat|\bbmi\b|body composition"),
    (
        MetricKey::CaloriesConsumed,
        r"calories (?:eaten|consumed|intake)|calorie intake|\bate\b|\beat(?:en|ing)?\b|\bdiet\b|\bnutrition\b|\bfood\b|\bmeals?\b",
    ),
    (MetricKey::Protein, r"\bprotein\b"),
    (MetricKey::Carbs, r"\bcarb\w*"),
    (MetricKey::Fat, r"\bfats?\b|dietary fat"),
    (MetricKey::Water, r"\bwater\b|\bhydrat\w*|\bfluids?\b"),
    (
        MetricKey::Workouts,
        r"\bworkouts?\b|\bexercis\w*|\btraining\b|\bgym\b|\bruns?\b|\brunning\b|\bran\b|\bcycl\w*|\bswim\w*|\byoga\b",
    ),
];

static DEFAULT_METRIC_REGEXES: LazyLock<Vec<(MetricKey, Regex)>> = LazyLock::new(|| {
    METRIC_PATTERNS
        .iter()
        .map(|(key, pattern)| (*key, Regex::new(pattern).unwrap()))
        .collect()
});

/// Immutable vocabulary for one analyzer instance.
#[derive(Debug, Clone)]
pub struct Vocabulary {
    pub health_keywords: Vec<String>,
    pub question_starters: Vec<String>,
    pub min_question_chars: usize,
    /// Kept in canonical `MetricKey` order.
    pub metric_patterns: Vec<(MetricKey, Regex)>,
    pub time: TimeVocabulary,
}

impl Vocabulary {
    /// Build a vocabulary from raw tables, compiling the metric patterns.
    ///
    /// Patterns are re-sorted into canonical key order so extraction output
    /// never depends on table order.
    pub fn new(
        health_keywords: &[&str],
        question_starters: &[&str],
        min_question_chars: usize,
        metric_patterns: &[(MetricKey, &str)],
        time: TimeVocabulary,
    ) -> Result<Self, regex::Error> {
        let mut compiled = metric_patterns
            .iter()
            .map(|(key, pattern)| Regex::new(pattern).map(|re| (*key, re)))
            .collect::<Result<Vec<_>, _>>()?;
        compiled.sort_by_key(|(key, _)| *key);

        Ok(Self {
            health_keywords: lowercase_all(health_keywords),
            question_starters: lowercase_all(question_starters),
            min_question_chars,
            metric_patterns: compiled,
            time,
        })
    }
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self {
            health_keywords: lowercase_all(HEALTH_KEYWORDS),
            question_starters: lowercase_all(QUESTION_STARTERS),
            min_question_chars: MIN_QUESTION_CHARS,
            metric_patterns: DEFAULT_METRIC_REGEXES.clone(),
            time: TimeVocabulary::default(),
        }
    }
}

fn lowercase_all(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| w.to_lowercase()).collect()
}
