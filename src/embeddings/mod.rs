// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Embedding service boundary
//!
//! Converts chunk and query text into fixed-dimension dense vectors via an
//! external embedding service. The service is treated as an untrusted,
//! rate-limited boundary: every call has a timeout and bounded retry with
//! exponential backoff.

pub mod client;

pub use client::HttpEmbeddingClient;

use async_trait::async_trait;
use thiserror::Error;

/// Errors from the embedding boundary
#[derive(Error, Debug)]
pub enum EmbeddingError {
    /// HTTP-level failure from the provider
    #[error("Embedding API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    /// Request timed out
    #[error("Embedding request timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// Provider returned a vector of the wrong dimension
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Provider returned fewer or more vectors than inputs
    #[error("Embedding count mismatch: sent {sent} texts, received {received} vectors")]
    CountMismatch { sent: usize, received: usize },

    /// Response body did not parse
    #[error("Invalid embedding response: {0}")]
    InvalidResponse(String),

    /// All retry attempts failed
    #[error("Embedding failed after {attempts} attempts: {message}")]
    RetriesExhausted { attempts: u32, message: String },
}

impl EmbeddingError {
    /// Whether another attempt could succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            EmbeddingError::Timeout { .. } => true,
            EmbeddingError::ApiError { status, .. } => {
                *status == 429 || *status >= 500 || *status == 0
            }
            _ => false,
        }
    }
}

/// Boundary trait for embedding providers.
///
/// Implementations must be order-preserving: vector `i` embeds text `i`.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a batch of texts into fixed-dimension vectors
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    /// The dimension every returned vector has
    fn dimension(&self) -> usize;

    /// Embed a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        vectors.pop().ok_or(EmbeddingError::CountMismatch {
            sent: 1,
            received: 0,
        })
    }
}
