pub mod config;
pub mod models;
pub mod db;
pub mod pipeline;

use tracing_subscriber::EnvFilter;

pub use config::EngineConfig;
pub use pipeline::rag::analyzer::QueryAnalyzer;
pub use pipeline::rag::ollama::OllamaClient;
pub use pipeline::rag::orchestrator::ContextOrchestrator;
pub use pipeline::rag::prompt::{build_chat_prompt, DEFAULT_SYSTEM_PROMPT};
pub use pipeline::rag::refine::RefiningAnalyzer;
pub use pipeline::rag::store::{InMemoryHealthStore, SqliteHealthStore};
pub use pipeline::rag::types::{
    HealthDataStore, IntentAnalyzer, LlmGenerate, QueryAnalysis, RagContext, RagContextMetadata,
    TimeRange,
};
pub use pipeline::rag::RagError;

/// Install a fmt subscriber honoring `RUST_LOG`, else `config::default_log_filter()`.
///
/// Does nothing if a global subscriber is already set.
pub fn init_tracing() {
    let installed = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .try_init()
        .is_ok();

    if installed {
        tracing::info!("{} v{} tracing initialised", config::APP_NAME, config::APP_VERSION);
    }
}
