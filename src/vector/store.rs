// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Vector store
//!
//! Persists chunk text, metadata, and embeddings keyed by `chunk_id`, and
//! serves nearest-neighbor search over them. Upserts are idempotent: the
//! same id replaces the prior entry in place, keeping its insertion slot so
//! score ties always break the same way. Search goes through the HNSW index
//! when one is current and falls back to an exact scan otherwise, so it
//! never returns fewer results than the store can supply up to k.
//!
//! Snapshot persistence is a JSONL file, one entry per line, written
//! atomically via a temp file rename.

use std::collections::HashMap;
use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;

use tokio::sync::RwLock;
use tracing::{debug, info};

use super::hnsw::HnswIndex;
use super::{EmbeddedChunk, StoreError};

/// One search hit: the stored chunk plus its similarity to the query.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk: EmbeddedChunk,
    /// Cosine similarity to the query vector
    pub score: f32,
}

struct StoreInner {
    /// chunk_id -> slot in `entries`
    slots: HashMap<String, usize>,
    /// Entries in insertion order; replacement keeps the slot
    entries: Vec<EmbeddedChunk>,
    index: Option<HnswIndex>,
    /// Entries changed since the index was built
    stale: bool,
}

/// Vector store with ANN search and JSONL snapshot persistence.
pub struct VectorStore {
    dimension: usize,
    path: Option<PathBuf>,
    inner: RwLock<StoreInner>,
}

impl VectorStore {
    /// Open a store, loading the snapshot at `path` when it exists.
    pub fn open(dimension: usize, path: Option<PathBuf>) -> Result<Self, StoreError> {
        let mut inner = StoreInner {
            slots: HashMap::new(),
            entries: Vec::new(),
            index: None,
            stale: false,
        };

        if let Some(ref p) = path {
            if p.exists() {
                let file = fs::File::open(p)?;
                for line in BufReader::new(file).lines() {
                    let line = line?;
                    if line.trim().is_empty() {
                        continue;
                    }
                    let entry: EmbeddedChunk = serde_json::from_str(&line)?;
                    insert_entry(&mut inner, entry);
                }
                info!("Loaded {} chunks from {}", inner.entries.len(), p.display());
            }
        }

        Ok(Self {
            dimension,
            path,
            inner: RwLock::new(inner),
        })
    }

    /// In-memory store with no snapshot file
    pub fn in_memory(dimension: usize) -> Self {
        Self::open(dimension, None).expect("in-memory store cannot fail to open")
    }

    /// Upsert a batch of embedded chunks, idempotent by `chunk_id`.
    pub async fn upsert(&self, batch: Vec<EmbeddedChunk>) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;

        for entry in &batch {
            if entry.embedding.len() != self.dimension {
                return Err(StoreError::DimensionMismatch {
                    chunk_id: entry.chunk_id.clone(),
                    expected: self.dimension,
                    actual: entry.embedding.len(),
                });
            }
            if entry.embedding.iter().any(|v| !v.is_finite()) {
                return Err(StoreError::InvalidVector {
                    chunk_id: entry.chunk_id.clone(),
                });
            }
        }

        for entry in batch {
            insert_entry(&mut inner, entry);
        }
        inner.stale = true;

        Ok(())
    }

    /// Search for the k nearest chunks by cosine similarity.
    ///
    /// Results come back ordered by score descending, ties broken by
    /// insertion order. An empty store returns an empty list, never an
    /// error.
    pub async fn search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredChunk>, StoreError> {
        let inner = self.inner.read().await;
        if inner.entries.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        if query.len() != self.dimension {
            return Err(StoreError::DimensionMismatch {
                chunk_id: "<query>".to_string(),
                expected: self.dimension,
                actual: query.len(),
            });
        }

        let wanted = k.min(inner.entries.len());

        if let (Some(index), false) = (&inner.index, inner.stale) {
            let hits = index.search(query, k)?;
            if hits.len() >= wanted {
                return Ok(hits
                    .into_iter()
                    .map(|hit| ScoredChunk {
                        chunk: inner.entries[hit.slot].clone(),
                        score: hit.score,
                    })
                    .collect());
            }
            // Approximate search came up short; the exact scan below keeps
            // the up-to-k guarantee.
            debug!("Index returned {} of {} wanted hits, falling back to scan", hits.len(), wanted);
        }

        Ok(exact_scan(&inner.entries, query, k))
    }

    /// Build or refresh the ANN index over the current entries.
    ///
    /// Safe to call repeatedly: a current index is left untouched. On
    /// failure the previous index is discarded so a stale one can never
    /// serve queries silently.
    pub async fn ensure_index(&self) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        if inner.index.is_some() && !inner.stale {
            return Ok(());
        }

        inner.index = None;
        let slotted: Vec<(usize, &EmbeddedChunk)> = inner.entries.iter().enumerate().collect();
        let index = HnswIndex::build(&slotted, self.dimension)
            .map_err(|e| StoreError::IndexBuildFailed(e.to_string()))?;

        debug!("Built HNSW index over {} chunks", index.len());
        inner.index = Some(index);
        inner.stale = false;
        Ok(())
    }

    /// Write the snapshot file, if a path is configured.
    pub async fn save(&self) -> Result<(), StoreError> {
        let Some(ref path) = self.path else {
            return Ok(());
        };
        let inner = self.inner.read().await;

        let tmp = path.with_extension("tmp");
        {
            let mut file = fs::File::create(&tmp)?;
            for entry in &inner.entries {
                serde_json::to_writer(&mut file, entry)?;
                file.write_all(b"\n")?;
            }
            file.flush()?;
        }
        fs::rename(&tmp, path)?;

        debug!("Saved {} chunks to {}", inner.entries.len(), path.display());
        Ok(())
    }

    /// Number of stored chunks
    pub async fn len(&self) -> usize {
        self.inner.read().await.entries.len()
    }

    /// True when no chunks are stored
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.entries.is_empty()
    }

    /// All stored chunk ids, in insertion order
    pub async fn chunk_ids(&self) -> Vec<String> {
        self.inner
            .read()
            .await
            .entries
            .iter()
            .map(|e| e.chunk_id.clone())
            .collect()
    }

    /// Store dimensionality
    pub fn dimension(&self) -> usize {
        self.dimension
    }
}

fn insert_entry(inner: &mut StoreInner, entry: EmbeddedChunk) {
    match inner.slots.get(&entry.chunk_id) {
        Some(&slot) => {
            inner.entries[slot] = entry;
        }
        None => {
            inner.slots.insert(entry.chunk_id.clone(), inner.entries.len());
            inner.entries.push(entry);
        }
    }
}

/// Exact cosine scan, the correctness baseline behind the index.
fn exact_scan(entries: &[EmbeddedChunk], query: &[f32], k: usize) -> Vec<ScoredChunk> {
    let mut scored: Vec<(usize, f32)> = entries
        .iter()
        .enumerate()
        .map(|(slot, entry)| (slot, cosine_similarity(query, &entry.embedding)))
        .collect();

    scored.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.0.cmp(&b.0))
    });

    scored
        .into_iter()
        .take(k)
        .map(|(slot, score)| ScoredChunk {
            chunk: entries[slot].clone(),
            score,
        })
        .collect()
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
