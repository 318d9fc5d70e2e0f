use std::path::PathBuf;
use std::str::FromStr;

/// Application-level constants
pub const APP_NAME: &str = "WellnessRag";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Environment variable prefix for `EngineConfig::from_env`.
pub const ENV_PREFIX: &str = "WELLNESS_RAG_";

/// Get the application data directory (`~/WellnessRag/`).
/// `None` when the home directory cannot be determined.
pub fn app_data_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(APP_NAME))
}

/// Default location of the SQLite health store.
pub fn default_database_path() -> Option<PathBuf> {
    app_data_dir().map(|dir| dir.join("health.db"))
}

/// Default tracing filter: this crate at info.
pub fn default_log_filter() -> String {
    "wellness_rag=info".to_string()
}

/// Tunables for retrieval and the generation client.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Windows up to this many days get the detailed view.
    pub detail_window_days: u32,
    /// Fallback window when the query names no time period.
    pub default_window_days: u32,
    pub max_detailed_events: usize,
    pub summary_events: usize,
    pub upload_recency_months: u32,
    pub refinement_enabled: bool,
    pub ollama_base_url: String,
    pub ollama_model: String,
    pub ollama_timeout_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            detail_window_days: 3,
            default_window_days: 7,
            max_detailed_events: 20,
            summary_events: 10,
            upload_recency_months: 6,
            refinement_enabled: true,
            ollama_base_url: "http://localhost:11434".to_string(),
            ollama_model: "llama3.1".to_string(),
            ollama_timeout_secs: 30,
        }
    }
}

impl EngineConfig {
    /// Defaults overlaid with `WELLNESS_RAG_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env` with an injectable variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        let get = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));

        overlay(&mut config.detail_window_days, "DETAIL_WINDOW_DAYS", get("DETAIL_WINDOW_DAYS"));
        overlay(&mut config.default_window_days, "DEFAULT_WINDOW_DAYS", get("DEFAULT_WINDOW_DAYS"));
        overlay(&mut config.max_detailed_events, "MAX_DETAILED_EVENTS", get("MAX_DETAILED_EVENTS"));
        overlay(&mut config.summary_events, "SUMMARY_EVENTS", get("SUMMARY_EVENTS"));
        overlay(
            &mut config.upload_recency_months,
            "UPLOAD_RECENCY_MONTHS",
            get("UPLOAD_RECENCY_MONTHS"),
        );
        overlay(&mut config.refinement_enabled, "REFINEMENT_ENABLED", get("REFINEMENT_ENABLED"));
        overlay(&mut config.ollama_timeout_secs, "OLLAMA_TIMEOUT_SECS", get("OLLAMA_TIMEOUT_SECS"));

        if let Some(url) = get("OLLAMA_URL").filter(|v| !v.trim().is_empty()) {
            config.ollama_base_url = url.trim().trim_end_matches('/').to_string();
        }
        if let Some(model) = get("OLLAMA_MODEL").filter(|v| !v.trim().is_empty()) {
            config.ollama_model = model.trim().to_string();
        }

        config
    }
}

fn overlay<T: FromStr>(field: &mut T, name: &str, raw: Option<String>) {
    let Some(raw) = raw else { return };
    match raw.trim().parse() {
        Ok(value) => *field = value,
        Err(_) => tracing::warn!(
            variable = %format!("{ENV_PREFIX}{name}"),
            value = %raw,
            "Ignoring unparseable configuration value"
        ),
    }
}
