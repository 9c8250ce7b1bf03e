// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Cross-encoder relevance scoring
//!
//! A cross-encoder reads the query and a candidate together and scores how
//! well the candidate answers it, which is considerably more precise than
//! raw embedding similarity on a small candidate set.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::RerankerConfig;

use super::RetrievalError;

/// Boundary trait for relevance scorers.
///
/// Returns one score per candidate, in candidate order.
#[async_trait]
pub trait RelevanceScorer: Send + Sync {
    async fn score(&self, query: &str, candidates: &[String]) -> Result<Vec<f32>, RetrievalError>;
}

/// Client for a TEI-style `POST /rerank` cross-encoder endpoint.
///
/// Request: `{"query": ..., "texts": [...]}`; response: a list of
/// `{"index": n, "score": s}` objects, not necessarily in input order.
pub struct HttpRerankerClient {
    client: Client,
    config: RerankerConfig,
}

#[derive(Serialize)]
struct RerankRequest<'a> {
    query: &'a str,
    texts: &'a [String],
}

#[derive(Deserialize)]
struct RerankEntry {
    index: usize,
    score: f32,
}

impl HttpRerankerClient {
    /// Create a client from reranker configuration
    pub fn new(config: RerankerConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .expect("Failed to create HTTP client");

        Self { client, config }
    }
}

#[async_trait]
impl RelevanceScorer for HttpRerankerClient {
    async fn score(&self, query: &str, candidates: &[String]) -> Result<Vec<f32>, RetrievalError> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/rerank", self.config.api_url.trim_end_matches('/'));
        let mut request = self.client.post(&url).json(&RerankRequest {
            query,
            texts: candidates,
        });
        if let Some(ref key) = self.config.api_key {
            request = request.bearer_auth(key.trim());
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                RetrievalError::ScorerTimeout {
                    timeout_ms: self.config.timeout_ms,
                }
            } else {
                RetrievalError::Scorer {
                    status: 0,
                    message: e.to_string(),
                }
            }
        })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(RetrievalError::Scorer { status, message });
        }

        let entries: Vec<RerankEntry> = response.json().await.map_err(|e| RetrievalError::Scorer {
            status: 0,
            message: format!("invalid rerank response: {}", e),
        })?;

        if entries.len() != candidates.len() {
            return Err(RetrievalError::CountMismatch {
                sent: candidates.len(),
                received: entries.len(),
            });
        }

        let mut scores = vec![0.0f32; candidates.len()];
        for entry in entries {
            if entry.index >= candidates.len() {
                return Err(RetrievalError::CountMismatch {
                    sent: candidates.len(),
                    received: entry.index + 1,
                });
            }
            scores[entry.index] = entry.score;
        }

        Ok(scores)
    }
}
