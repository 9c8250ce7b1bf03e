// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Vector persistence and similarity search

pub mod hnsw;
pub mod store;

pub use hnsw::HnswIndex;
pub use store::{ScoredChunk, VectorStore};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A chunk with its embedding, the unit the store persists.
///
/// Owned by the store once upserted; superseded, never mutated, when the
/// same `chunk_id` is upserted again.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddedChunk {
    /// Deterministic chunk fingerprint (unique key)
    pub chunk_id: String,
    /// Identifier of the source record
    pub record_id: String,
    /// Retrieval text (title-contextualized chunk body)
    pub text: String,
    /// Structured metadata carried from ingestion
    pub metadata: serde_json::Value,
    /// Dense embedding vector
    pub embedding: Vec<f32>,
    /// When this entry was embedded
    pub created_at: DateTime<Utc>,
}

/// Errors from the vector store and its index
#[derive(Error, Debug)]
pub enum StoreError {
    /// Snapshot file I/O failure
    #[error("Store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot line failed to serialize or parse
    #[error("Store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A vector has the wrong dimension for this store
    #[error("Dimension mismatch for chunk {chunk_id}: expected {expected}, got {actual}")]
    DimensionMismatch {
        chunk_id: String,
        expected: usize,
        actual: usize,
    },

    /// A vector contains NaN or infinite components
    #[error("Invalid vector for chunk {chunk_id}: contains NaN or Infinity")]
    InvalidVector { chunk_id: String },

    /// ANN index construction failed
    #[error("Failed to build index: {0}")]
    IndexBuildFailed(String),
}
