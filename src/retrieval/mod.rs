// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Retrieval: vector search plus cross-encoder reranking

pub mod reranker;
pub mod retriever;

pub use reranker::{HttpRerankerClient, RelevanceScorer};
pub use retriever::Retriever;

use thiserror::Error;

/// One retrieved chunk with both scoring stages attached.
///
/// Ephemeral: produced by the retriever, consumed within one turn.
#[derive(Debug, Clone)]
pub struct RetrievalResult {
    /// Chunk fingerprint
    pub chunk_id: String,
    /// Retrieval text of the chunk
    pub text: String,
    /// Chunk metadata
    pub metadata: serde_json::Value,
    /// Cosine similarity from vector search
    pub similarity: f32,
    /// Cross-encoder relevance score
    pub rerank_score: f32,
}

/// Errors on the retrieval path.
///
/// These never propagate past the retriever: a failed search degrades to an
/// empty result set, which the judge treats as insufficient context.
#[derive(Error, Debug)]
pub enum RetrievalError {
    /// Query embedding failed
    #[error("Query embedding failed: {0}")]
    Embedding(#[from] crate::embeddings::EmbeddingError),

    /// Vector store search failed
    #[error("Vector search failed: {0}")]
    Store(#[from] crate::vector::StoreError),

    /// Cross-encoder scoring call failed
    #[error("Reranker error: {status} - {message}")]
    Scorer { status: u16, message: String },

    /// Scoring call timed out
    #[error("Reranker timeout after {timeout_ms}ms")]
    ScorerTimeout { timeout_ms: u64 },

    /// Scorer returned the wrong number of scores
    #[error("Score count mismatch: sent {sent} candidates, received {received} scores")]
    CountMismatch { sent: usize, received: usize },
}
