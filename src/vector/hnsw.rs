// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! HNSW index for fast vector search
//!
//! Hierarchical Navigable Small World (HNSW) algorithm for approximate
//! nearest neighbor search over the store's embedding column. Uses cosine
//! distance; vectors are normalized on insert so distances translate
//! directly to cosine similarity.

use std::collections::HashMap;
use std::sync::Arc;

use hnsw_rs::hnsw::{Hnsw, Neighbour};
use hnsw_rs::prelude::*;

use super::{EmbeddedChunk, StoreError};

/// A neighbor returned by the index: slot into the store's entry list plus
/// cosine similarity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexHit {
    /// Insertion slot of the matching entry
    pub slot: usize,
    /// Cosine similarity, higher is closer
    pub score: f32,
}

/// HNSW index over the store's embeddings.
///
/// Thread-safe for concurrent searches; rebuilt (not mutated) when the
/// underlying entries change.
pub struct HnswIndex {
    hnsw: Arc<Hnsw<'static, f32, DistCosine>>,
    /// Maps HNSW internal ids back to store slots
    slot_map: Arc<HashMap<usize, usize>>,
    dimensions: usize,
    len: usize,
}

impl HnswIndex {
    /// Build an index over the given entries.
    ///
    /// `slots` pairs each entry with its insertion slot in the store, so
    /// hits can be mapped back to entries after approximate search.
    pub fn build(entries: &[(usize, &EmbeddedChunk)], dimensions: usize) -> Result<Self, StoreError> {
        if entries.is_empty() {
            return Ok(Self {
                hnsw: Arc::new(Hnsw::new(16, 1, 16, 200, DistCosine)),
                slot_map: Arc::new(HashMap::new()),
                dimensions,
                len: 0,
            });
        }

        for (_, entry) in entries {
            if entry.embedding.len() != dimensions {
                return Err(StoreError::DimensionMismatch {
                    chunk_id: entry.chunk_id.clone(),
                    expected: dimensions,
                    actual: entry.embedding.len(),
                });
            }
            if entry.embedding.iter().any(|v| !v.is_finite()) {
                return Err(StoreError::InvalidVector {
                    chunk_id: entry.chunk_id.clone(),
                });
            }
        }

        // Parameters tuned for fast construction on corpus-scale data
        let max_nb_connection = 16;
        let ef_construction = 200;
        let nb_layer = ((entries.len() as f32).log2().ceil() as usize).clamp(4, 16);

        let mut hnsw: Hnsw<f32, DistCosine> = Hnsw::new(
            max_nb_connection,
            entries.len(),
            nb_layer,
            ef_construction,
            DistCosine,
        );

        let mut slot_map = HashMap::with_capacity(entries.len());
        for (hnsw_id, (slot, entry)) in entries.iter().enumerate() {
            let normalized = normalize_vector(&entry.embedding);
            hnsw.insert((&normalized, hnsw_id));
            slot_map.insert(hnsw_id, *slot);
        }

        hnsw.set_searching_mode(true);

        Ok(Self {
            hnsw: Arc::new(hnsw),
            slot_map: Arc::new(slot_map),
            dimensions,
            len: entries.len(),
        })
    }

    /// Search for the k nearest entries.
    ///
    /// Returns hits ordered by similarity descending. Never errors on an
    /// empty index; it returns an empty list.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<IndexHit>, StoreError> {
        if query.len() != self.dimensions {
            return Err(StoreError::DimensionMismatch {
                chunk_id: "<query>".to_string(),
                expected: self.dimensions,
                actual: query.len(),
            });
        }
        if query.iter().any(|v| !v.is_finite()) {
            return Err(StoreError::InvalidVector {
                chunk_id: "<query>".to_string(),
            });
        }
        if self.len == 0 || k == 0 {
            return Ok(Vec::new());
        }

        let normalized = normalize_vector(query);
        let ef_search = (k * 2).max(50);
        let neighbours: Vec<Neighbour> = self.hnsw.search(&normalized, k.min(self.len), ef_search);

        let mut hits: Vec<IndexHit> = neighbours
            .into_iter()
            .filter_map(|n| {
                self.slot_map.get(&n.d_id).map(|slot| IndexHit {
                    slot: *slot,
                    // Cosine distance -> similarity
                    score: 1.0 - n.distance,
                })
            })
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.slot.cmp(&b.slot))
        });

        Ok(hits)
    }

    /// Number of indexed vectors
    pub fn len(&self) -> usize {
        self.len
    }

    /// True when nothing is indexed
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Index dimensionality
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }
}

/// Normalize a vector to unit length for cosine similarity.
fn normalize_vector(vector: &[f32]) -> Vec<f32> {
    let magnitude: f32 = vector.iter().map(|&x| x * x).sum::<f32>().sqrt();
    if magnitude == 0.0 || !magnitude.is_finite() {
        return vector.to_vec();
    }
    vector.iter().map(|&x| x / magnitude).collect()
}
