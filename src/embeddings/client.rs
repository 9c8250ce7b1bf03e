// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! HTTP embedding client
//!
//! Speaks the OpenAI-style `POST /v1/embeddings` protocol. Responses carry
//! an index per vector; vectors are re-ordered by that index so the output
//! always lines up with the input batch.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::EmbeddingConfig;

use super::{EmbeddingError, EmbeddingProvider};

/// Embedding client for an OpenAI-style embeddings endpoint
pub struct HttpEmbeddingClient {
    client: Client,
    config: EmbeddingConfig,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Deserialize)]
struct EmbeddingDatum {
    index: usize,
    embedding: Vec<f32>,
}

impl HttpEmbeddingClient {
    /// Create a client from embedding configuration
    pub fn new(config: EmbeddingConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .expect("Failed to create HTTP client");

        Self { client, config }
    }

    async fn request_once(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let url = format!("{}/v1/embeddings", self.config.api_url.trim_end_matches('/'));
        let body = EmbeddingRequest {
            model: &self.config.model,
            input: texts,
        };

        let mut request = self.client.post(&url).json(&body);
        if let Some(ref key) = self.config.api_key {
            request = request.bearer_auth(key.trim());
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                EmbeddingError::Timeout {
                    timeout_ms: self.config.timeout_ms,
                }
            } else {
                EmbeddingError::ApiError {
                    status: 0,
                    message: e.to_string(),
                }
            }
        })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::ApiError { status, message });
        }

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingError::InvalidResponse(e.to_string()))?;

        if parsed.data.len() != texts.len() {
            return Err(EmbeddingError::CountMismatch {
                sent: texts.len(),
                received: parsed.data.len(),
            });
        }

        // Re-order by the index the provider reports
        let mut ordered: Vec<Vec<f32>> = vec![Vec::new(); texts.len()];
        for datum in parsed.data {
            if datum.index >= texts.len() {
                return Err(EmbeddingError::InvalidResponse(format!(
                    "vector index {} out of range",
                    datum.index
                )));
            }
            if datum.embedding.len() != self.config.dimension {
                return Err(EmbeddingError::DimensionMismatch {
                    expected: self.config.dimension,
                    actual: datum.embedding.len(),
                });
            }
            ordered[datum.index] = datum.embedding;
        }

        Ok(ordered)
    }
}

#[async_trait]
impl EmbeddingProvider for HttpEmbeddingClient {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut last_error = None;
        for attempt in 1..=self.config.max_retries {
            match self.request_once(texts).await {
                Ok(vectors) => {
                    debug!("Embedded batch of {} texts (attempt {})", texts.len(), attempt);
                    return Ok(vectors);
                }
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    let delay = Duration::from_millis(500 * 2u64.pow(attempt - 1));
                    warn!(
                        "Embedding attempt {}/{} failed: {}, retrying in {:?}",
                        attempt, self.config.max_retries, e, delay
                    );
                    tokio::time::sleep(delay).await;
                    last_error = Some(e);
                }
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) => last_error = Some(e),
            }
        }

        Err(EmbeddingError::RetriesExhausted {
            attempts: self.config.max_retries,
            message: last_error.map(|e| e.to_string()).unwrap_or_default(),
        })
    }

    fn dimension(&self) -> usize {
        self.config.dimension
    }
}
