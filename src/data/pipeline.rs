// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Corpus ingestion pipeline
//!
//! Load → validate/clean → chunk → embed in batches → upsert. A batch that
//! fails to embed is logged with its chunk ids and skipped so a later run
//! can pick it up; store failures abort the run. Because chunk ids are
//! deterministic fingerprints, re-running over the same corpus converges to
//! the same store contents.

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::NodeConfig;
use crate::embeddings::EmbeddingProvider;
use crate::vector::{EmbeddedChunk, StoreError, VectorStore};

use super::chunking::Chunker;
use super::cleaning::{clean_text, validate_record};
use super::loader::CorpusReader;
use super::types::{Chunk, RawRecord};

/// Fatal ingestion failures. Per-record and per-batch problems are counted
/// in [`IngestStats`] instead.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Corpus file missing or unreadable
    #[error("Failed to read corpus at {path}: {source}")]
    Corpus {
        path: String,
        source: std::io::Error,
    },

    /// Vector store or index failure; aborts the run
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Summary of one ingestion run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestStats {
    /// Records parsed and transformed successfully
    pub records_processed: usize,
    /// Records skipped for validation failures (including malformed lines)
    pub records_skipped: usize,
    /// Chunks written to the vector store
    pub chunks_persisted: usize,
    /// Embedding batches that failed after retry exhaustion
    pub failed_batches: usize,
}

/// Ingestion pipeline wiring chunker, embedder, and store together.
pub struct IngestionPipeline {
    chunker: Chunker,
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<VectorStore>,
    batch_size: usize,
}

impl IngestionPipeline {
    /// Build a pipeline from node configuration and shared handles.
    pub fn new(
        config: &NodeConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<VectorStore>,
    ) -> Self {
        Self {
            chunker: Chunker::new(&config.chunking),
            embedder,
            store,
            batch_size: config.embedding.batch_size.max(1),
        }
    }

    /// Run the full pipeline over a corpus file.
    pub async fn run(&self, corpus_path: &Path) -> Result<IngestStats, PipelineError> {
        info!("📥 Ingesting corpus from {}", corpus_path.display());

        let reader = CorpusReader::open(corpus_path).map_err(|e| PipelineError::Corpus {
            path: corpus_path.display().to_string(),
            source: e,
        })?;

        let mut stats = IngestStats::default();
        let mut pending: Vec<Chunk> = Vec::with_capacity(self.batch_size);

        for item in reader {
            let record = match item {
                Ok(record) => record,
                Err(e) => {
                    debug!("Skipping malformed corpus line: {}", e);
                    stats.records_skipped += 1;
                    continue;
                }
            };

            let cleaned = match self.transform(&record) {
                Ok(cleaned) => cleaned,
                Err(e) => {
                    debug!("Skipping record {}: {}", record.id, e);
                    stats.records_skipped += 1;
                    continue;
                }
            };

            pending.extend(self.chunker.chunk(&cleaned));
            stats.records_processed += 1;

            while pending.len() >= self.batch_size {
                let batch: Vec<Chunk> = pending.drain(..self.batch_size).collect();
                self.flush_batch(batch, &mut stats).await?;
            }
        }

        if !pending.is_empty() {
            self.flush_batch(pending, &mut stats).await?;
        }

        self.store.ensure_index().await?;
        self.store.save().await?;

        info!(
            "✅ Ingestion complete: {} records processed, {} skipped, {} chunks persisted, {} failed batches",
            stats.records_processed,
            stats.records_skipped,
            stats.chunks_persisted,
            stats.failed_batches
        );
        if stats.failed_batches > 0 {
            warn!(
                "{} batches failed to embed; re-run ingestion to pick them up",
                stats.failed_batches
            );
        }

        Ok(stats)
    }

    /// Validate a record and clean its text fields.
    fn transform(&self, record: &RawRecord) -> Result<RawRecord, super::cleaning::ValidationError> {
        validate_record(record)?;
        Ok(RawRecord {
            id: record.id.clone(),
            title: clean_text(&record.title)?,
            body: clean_text(&record.body)?,
            metadata: record.metadata.clone(),
        })
    }

    /// Embed one batch and upsert it.
    ///
    /// Embedding failure skips the batch (resumable); store failure aborts.
    async fn flush_batch(
        &self,
        batch: Vec<Chunk>,
        stats: &mut IngestStats,
    ) -> Result<(), PipelineError> {
        let texts: Vec<String> = batch.iter().map(|c| c.embedding_text()).collect();

        let vectors = match self.embedder.embed_batch(&texts).await {
            Ok(vectors) => vectors,
            Err(e) => {
                let ids: Vec<&str> = batch.iter().map(|c| c.chunk_id.as_str()).collect();
                warn!(
                    "Embedding batch of {} chunks failed: {} (unembedded chunk ids: {})",
                    batch.len(),
                    e,
                    ids.join(", ")
                );
                stats.failed_batches += 1;
                return Ok(());
            }
        };

        let now = Utc::now();
        let embedded: Vec<EmbeddedChunk> = batch
            .into_iter()
            .zip(vectors)
            .zip(texts)
            .map(|((chunk, embedding), text)| EmbeddedChunk {
                chunk_id: chunk.chunk_id,
                record_id: chunk.record_id,
                text,
                metadata: serde_json::Value::Object(chunk.metadata),
                embedding,
                created_at: now,
            })
            .collect();

        let count = embedded.len();
        self.store.upsert(embedded).await?;
        stats.chunks_persisted += count;
        debug!("Persisted batch of {} chunks", count);

        Ok(())
    }
}
