// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Node configuration
//!
//! All configuration is loaded from environment variables at startup into a
//! single `NodeConfig` that is passed explicitly into the components that
//! need it. There are no process-wide singletons.

use std::env;
use std::path::PathBuf;

use crate::search::SearchConfig;

/// Top-level configuration for the QA node
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// HTTP API configuration
    pub api: ApiConfig,
    /// Embedding service configuration
    pub embedding: EmbeddingConfig,
    /// Text completion service configuration
    pub completion: CompletionConfig,
    /// Cross-encoder reranker service configuration
    pub reranker: RerankerConfig,
    /// Vector store configuration
    pub store: StoreConfig,
    /// Chunking policy
    pub chunking: ChunkingConfig,
    /// Retrieval policy
    pub retrieval: RetrievalConfig,
    /// Agent behavior configuration
    pub agent: AgentConfig,
    /// Web search fallback configuration
    pub search: SearchConfig,
}

/// HTTP API configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Port the API server listens on
    pub port: u16,
}

/// Embedding service configuration (OpenAI-style `/v1/embeddings` endpoint)
#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    /// Base URL of the embedding service
    pub api_url: String,
    /// API key, if the service requires one
    pub api_key: Option<String>,
    /// Model name sent with each request
    pub model: String,
    /// Expected embedding dimension
    pub dimension: usize,
    /// Maximum texts per embedding request
    pub batch_size: usize,
    /// Request timeout in milliseconds
    pub timeout_ms: u64,
    /// Maximum attempts per batch before the batch fails
    pub max_retries: u32,
}

/// Text completion service configuration (OpenAI-style chat completions)
#[derive(Debug, Clone)]
pub struct CompletionConfig {
    /// Base URL of the completion service
    pub api_url: String,
    /// API key, if the service requires one
    pub api_key: Option<String>,
    /// Model name sent with each request
    pub model: String,
    /// Sampling temperature for answer generation
    pub temperature: f32,
    /// Request timeout in milliseconds
    pub timeout_ms: u64,
    /// Maximum attempts per call before giving up
    pub max_retries: u32,
}

/// Cross-encoder reranker service configuration (TEI-style `/rerank` endpoint)
#[derive(Debug, Clone)]
pub struct RerankerConfig {
    /// Base URL of the reranker service
    pub api_url: String,
    /// API key, if the service requires one
    pub api_key: Option<String>,
    /// Request timeout in milliseconds
    pub timeout_ms: u64,
}

/// Vector store configuration
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Snapshot file path; None keeps the store in memory only
    pub path: Option<PathBuf>,
}

/// Chunking policy
#[derive(Debug, Clone)]
pub struct ChunkingConfig {
    /// Maximum chunk size in characters
    pub max_chunk_size: usize,
    /// Overlap between consecutive chunks in characters
    pub overlap_size: usize,
}

/// Retrieval policy
#[derive(Debug, Clone)]
pub struct RetrievalConfig {
    /// Candidates fetched from the vector store before reranking
    pub k_candidates: usize,
    /// Results kept after reranking
    pub n_final: usize,
    /// Minimum cosine similarity for a candidate to reach the reranker
    pub score_threshold: f32,
}

/// Agent behavior configuration
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Maximum conversation messages carried into a turn
    pub max_history: usize,
}

impl NodeConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            api: ApiConfig {
                port: env_parse("API_PORT", 8080),
            },
            embedding: EmbeddingConfig {
                api_url: env::var("EMBEDDING_API_URL")
                    .unwrap_or_else(|_| "https://api.openai.com".to_string()),
                api_key: env::var("EMBEDDING_API_KEY")
                    .or_else(|_| env::var("OPENAI_API_KEY"))
                    .ok(),
                model: env::var("EMBEDDING_MODEL")
                    .unwrap_or_else(|_| "text-embedding-3-small".to_string()),
                dimension: env_parse("EMBEDDING_DIMENSION", 1536),
                batch_size: env_parse("EMBEDDING_BATCH_SIZE", 500),
                timeout_ms: env_parse("EMBEDDING_TIMEOUT_MS", 30_000),
                max_retries: env_parse("EMBEDDING_MAX_RETRIES", 3),
            },
            completion: CompletionConfig {
                api_url: env::var("COMPLETION_API_URL")
                    .unwrap_or_else(|_| "https://api.openai.com".to_string()),
                api_key: env::var("COMPLETION_API_KEY")
                    .or_else(|_| env::var("OPENAI_API_KEY"))
                    .ok(),
                model: env::var("COMPLETION_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
                temperature: env_parse("COMPLETION_TEMPERATURE", 0.7),
                timeout_ms: env_parse("COMPLETION_TIMEOUT_MS", 60_000),
                max_retries: env_parse("COMPLETION_MAX_RETRIES", 3),
            },
            reranker: RerankerConfig {
                api_url: env::var("RERANKER_API_URL")
                    .unwrap_or_else(|_| "http://localhost:8787".to_string()),
                api_key: env::var("RERANKER_API_KEY").ok(),
                timeout_ms: env_parse("RERANKER_TIMEOUT_MS", 10_000),
            },
            store: StoreConfig {
                path: env::var("STORE_PATH").ok().map(PathBuf::from),
            },
            chunking: ChunkingConfig {
                max_chunk_size: env_parse("CHUNK_SIZE", 1000),
                overlap_size: env_parse("CHUNK_OVERLAP", 200),
            },
            retrieval: RetrievalConfig {
                k_candidates: env_parse("RETRIEVAL_K_CANDIDATES", 10),
                n_final: env_parse("RETRIEVAL_N_FINAL", 3),
                score_threshold: env_parse("RETRIEVAL_SCORE_THRESHOLD", 0.5),
            },
            agent: AgentConfig {
                max_history: env_parse("AGENT_MAX_HISTORY", 10),
            },
            search: SearchConfig::from_env(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.embedding.dimension == 0 {
            return Err("Embedding dimension must be greater than 0".to_string());
        }
        if self.embedding.batch_size == 0 {
            return Err("Embedding batch size must be greater than 0".to_string());
        }
        if self.chunking.max_chunk_size == 0 {
            return Err("Chunk size must be greater than 0".to_string());
        }
        if self.chunking.overlap_size >= self.chunking.max_chunk_size {
            return Err(format!(
                "Chunk overlap ({}) must be smaller than chunk size ({})",
                self.chunking.overlap_size, self.chunking.max_chunk_size
            ));
        }
        if self.retrieval.n_final > self.retrieval.k_candidates {
            return Err(format!(
                "n_final ({}) cannot exceed k_candidates ({})",
                self.retrieval.n_final, self.retrieval.k_candidates
            ));
        }
        if !(0.0..=1.0).contains(&self.retrieval.score_threshold) {
            return Err("Retrieval score threshold must be between 0.0 and 1.0".to_string());
        }
        self.search.validate()?;
        Ok(())
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chunk_size: 1000,
            overlap_size: 200,
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            k_candidates: 10,
            n_final: 3,
            score_threshold: 0.5,
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self { max_history: 10 }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
