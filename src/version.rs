// Version information for the Fabstir QA Node

/// Full version string with feature description
pub const VERSION: &str = "v0.1.0-agentic-rag-2025-08-06";

/// Semantic version number
pub const VERSION_NUMBER: &str = "0.1.0";

/// Build date
pub const BUILD_DATE: &str = "2025-08-06";

/// Supported features in this version
pub const FEATURES: &[&str] = &[
    "corpus-ingestion",
    "hnsw-search",
    "cross-encoder-rerank",
    "intent-routing",
    "context-judging",
    "web-fallback",
    "grounded-generation",
];

/// Get formatted version string for logging
pub fn version_string() -> String {
    format!("fabstir-qa-node {} ({})", VERSION_NUMBER, BUILD_DATE)
}
