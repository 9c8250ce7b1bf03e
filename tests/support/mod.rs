// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Shared test fixtures: deterministic mock providers for the external
//! service boundaries, plus config builders.
#![allow(dead_code)]

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use fabstir_qa_node::completion::{CompletionProvider, GenerationError, PromptMessage};
use fabstir_qa_node::config::{
    AgentConfig, ApiConfig, ChunkingConfig, CompletionConfig, EmbeddingConfig, NodeConfig,
    RerankerConfig, RetrievalConfig, StoreConfig,
};
use fabstir_qa_node::embeddings::{EmbeddingError, EmbeddingProvider};
use fabstir_qa_node::retrieval::{RelevanceScorer, RetrievalError};
use fabstir_qa_node::search::{SearchConfig, SearchError, SearchProvider, SearchResult};

/// Test node configuration around small dimensions and batches.
pub fn test_config(dimension: usize, batch_size: usize, store_path: Option<PathBuf>) -> NodeConfig {
    NodeConfig {
        api: ApiConfig { port: 0 },
        embedding: EmbeddingConfig {
            api_url: "http://localhost:0".to_string(),
            api_key: None,
            model: "test-embed".to_string(),
            dimension,
            batch_size,
            timeout_ms: 1000,
            max_retries: 1,
        },
        completion: CompletionConfig {
            api_url: "http://localhost:0".to_string(),
            api_key: None,
            model: "test-chat".to_string(),
            temperature: 0.0,
            timeout_ms: 1000,
            max_retries: 1,
        },
        reranker: RerankerConfig {
            api_url: "http://localhost:0".to_string(),
            api_key: None,
            timeout_ms: 1000,
        },
        store: StoreConfig { path: store_path },
        chunking: ChunkingConfig {
            max_chunk_size: 1000,
            overlap_size: 200,
        },
        retrieval: RetrievalConfig {
            k_candidates: 10,
            n_final: 3,
            // Hash embeddings are uncorrelated with meaning; tests rely on
            // the reranker stage instead of a similarity floor
            score_threshold: -1.0,
        },
        agent: AgentConfig { max_history: 10 },
        search: SearchConfig::default(),
    }
}

/// Deterministic pseudo-random embeddings keyed by text hash, with a call
/// counter so tests can assert which paths touched the embedder.
pub struct HashEmbedder {
    pub dimension: usize,
    calls: AtomicUsize,
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn vector_for(&self, text: &str) -> Vec<f32> {
        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        let mut seed = hasher.finish();
        (0..self.dimension)
            .map(|i| {
                seed = seed.wrapping_mul(1664525).wrapping_add(1013904223) ^ (i as u64);
                (seed as f64 / u64::MAX as f64) as f32 * 2.0 - 1.0
            })
            .collect()
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts.iter().map(|t| self.vector_for(t)).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Embedder that fails on one specific batch call, for resumability tests.
pub struct FlakyEmbedder {
    inner: HashEmbedder,
    fail_on_call: usize,
    calls: AtomicUsize,
}

impl FlakyEmbedder {
    pub fn new(dimension: usize, fail_on_call: usize) -> Self {
        Self {
            inner: HashEmbedder::new(dimension),
            fail_on_call,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for FlakyEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call == self.fail_on_call {
            return Err(EmbeddingError::RetriesExhausted {
                attempts: 3,
                message: "scripted batch failure".to_string(),
            });
        }
        self.inner.embed_batch(texts).await
    }

    fn dimension(&self) -> usize {
        self.inner.dimension
    }
}

/// Scores candidates by how many question words they contain.
pub struct KeywordScorer;

#[async_trait]
impl RelevanceScorer for KeywordScorer {
    async fn score(&self, query: &str, candidates: &[String]) -> Result<Vec<f32>, RetrievalError> {
        let words: Vec<String> = query
            .to_lowercase()
            .split_whitespace()
            .filter(|w| w.len() > 3)
            .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_string())
            .collect();
        Ok(candidates
            .iter()
            .map(|c| {
                let lower = c.to_lowercase();
                words.iter().filter(|w| lower.contains(w.as_str())).count() as f32
            })
            .collect())
    }
}

/// Rule-based stand-in for the completion service.
///
/// Detects which node is calling from the prompt shape and answers the way
/// a well-behaved model would: routing labels for the router, yes/no for
/// the judge, and context-echoing answers for generation.
pub struct ScriptedCompletion {
    calls: AtomicUsize,
}

impl ScriptedCompletion {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn route(query: &str) -> &'static str {
        let q = query.trim().to_lowercase();
        let greetings = ["hi", "hello", "hey", "how are you?"];
        if greetings.contains(&q.as_str()) {
            "greeting"
        } else {
            "needs_kb"
        }
    }

    fn judge(prompt: &str) -> &'static str {
        let context = between(prompt, "Context:\n", "\n\nQuestion:").unwrap_or_default();
        let question = between(prompt, "Question: ", "\n").unwrap_or_default();
        let context = context.to_lowercase();
        let hits = question
            .to_lowercase()
            .split_whitespace()
            .filter(|w| w.len() > 3)
            .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_string())
            .filter(|w| context.contains(w.as_str()))
            .count();
        if hits >= 2 {
            "yes"
        } else {
            "no"
        }
    }

    fn answer(prompt: &str) -> String {
        let context = between(prompt, "Context:\n", "\n\nQuestion:").unwrap_or_default();
        format!("Based on the provided context: {}", context)
    }
}

#[async_trait]
impl CompletionProvider for ScriptedCompletion {
    async fn complete(
        &self,
        messages: &[PromptMessage],
        _temperature: Option<f32>,
    ) -> Result<String, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let system = messages
            .iter()
            .find(|m| m.role == "system")
            .map(|m| m.content.as_str())
            .unwrap_or("");
        let last_user = messages
            .iter()
            .rev()
            .find(|m| m.role == "user")
            .map(|m| m.content.as_str())
            .unwrap_or("");

        if system.contains("expert router") {
            return Ok(Self::route(last_user).to_string());
        }
        if last_user.starts_with("You are a judge.") {
            return Ok(Self::judge(last_user).to_string());
        }
        if last_user.starts_with("Context:\n") {
            return Ok(Self::answer(last_user));
        }
        // Direct path: answer from the conversation
        Ok(format!("Direct answer to: {}", last_user))
    }
}

/// Completion provider that always fails, for degradation tests.
pub struct FailingCompletion;

#[async_trait]
impl CompletionProvider for FailingCompletion {
    async fn complete(
        &self,
        _messages: &[PromptMessage],
        _temperature: Option<f32>,
    ) -> Result<String, GenerationError> {
        Err(GenerationError::RetriesExhausted {
            attempts: 3,
            message: "scripted completion outage".to_string(),
        })
    }
}

/// Search provider returning one fixed snippet.
pub struct StaticSearchProvider {
    pub snippet: String,
}

#[async_trait]
impl SearchProvider for StaticSearchProvider {
    async fn search(
        &self,
        query: &str,
        _num_results: usize,
    ) -> Result<Vec<SearchResult>, SearchError> {
        Ok(vec![SearchResult {
            title: format!("Web result for {}", query),
            url: "https://example.com/result".to_string(),
            snippet: self.snippet.clone(),
            source: "static".to_string(),
        }])
    }

    fn name(&self) -> &'static str {
        "static"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn priority(&self) -> u8 {
        10
    }
}

/// Search provider that always fails.
pub struct FailingSearchProvider;

#[async_trait]
impl SearchProvider for FailingSearchProvider {
    async fn search(
        &self,
        _query: &str,
        _num_results: usize,
    ) -> Result<Vec<SearchResult>, SearchError> {
        Err(SearchError::ApiError {
            status: 503,
            message: "scripted search outage".to_string(),
        })
    }

    fn name(&self) -> &'static str {
        "failing"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn priority(&self) -> u8 {
        10
    }
}

fn between<'a>(text: &'a str, start: &str, end: &str) -> Option<&'a str> {
    let from = text.find(start)? + start.len();
    let to = text[from..].find(end)? + from;
    Some(&text[from..to])
}

/// Helper: Arc-wrapped completion provider from a concrete type.
pub fn completion(provider: impl CompletionProvider + 'static) -> Arc<dyn CompletionProvider> {
    Arc::new(provider)
}
