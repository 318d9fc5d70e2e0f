pub mod types;
pub mod vocabulary;
pub mod time_range;
pub mod analyzer;
pub mod refine;
pub mod summary;
pub mod format;
pub mod aggregator;
pub mod store;
pub mod orchestrator;
pub mod prompt;
pub mod ollama;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RagError {
    #[error("Ollama connection failed: {0}")]
    OllamaConnection(String),

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Ollama returned {status}: {body}")]
    OllamaError { status: u16, body: String },

    #[error("Response parsing error: {0}")]
    ResponseParsing(String),

    #[error("Refinement output unusable: {0}")]
    RefinementParsing(String),
}
