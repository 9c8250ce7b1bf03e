// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Two-stage retriever
//!
//! Stage one embeds the query and pulls `k_candidates` neighbors from the
//! vector store; stage two scores the survivors with a cross-encoder and
//! keeps the top `n_final`. Candidates below the similarity floor never
//! reach the reranker.
//!
//! Tie policy: equal rerank scores keep the candidates' similarity rank.
//! The candidate list arrives similarity-ordered and the final sort is
//! stable, so no extra bookkeeping is needed.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::RetrievalConfig;
use crate::embeddings::EmbeddingProvider;
use crate::vector::VectorStore;

use super::reranker::RelevanceScorer;
use super::{RetrievalError, RetrievalResult};

/// Retriever combining vector search with cross-encoder reranking.
pub struct Retriever {
    embedder: Arc<dyn EmbeddingProvider>,
    scorer: Arc<dyn RelevanceScorer>,
    store: Arc<VectorStore>,
    config: RetrievalConfig,
}

impl Retriever {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        scorer: Arc<dyn RelevanceScorer>,
        store: Arc<VectorStore>,
        config: RetrievalConfig,
    ) -> Self {
        Self {
            embedder,
            scorer,
            store,
            config,
        }
    }

    /// Retrieve the most relevant chunks for a query.
    ///
    /// Never propagates retrieval failures: any error on the path degrades
    /// to an empty result set, which downstream judging treats as
    /// insufficient context.
    pub async fn retrieve(&self, query: &str) -> Vec<RetrievalResult> {
        match self.try_retrieve(query).await {
            Ok(results) => results,
            Err(e) => {
                warn!("Retrieval failed, returning no context: {}", e);
                Vec::new()
            }
        }
    }

    async fn try_retrieve(&self, query: &str) -> Result<Vec<RetrievalResult>, RetrievalError> {
        debug!("Retrieving for query: {:.80}", query);

        let query_vector = self.embedder.embed(query).await?;
        let candidates = self
            .store
            .search(&query_vector, self.config.k_candidates)
            .await?;

        if candidates.is_empty() {
            debug!("Vector search returned no candidates");
            return Ok(Vec::new());
        }
        info!("Retrieved {} candidates before filtering", candidates.len());

        // Similarity floor keeps obviously-unrelated chunks away from the
        // reranker (and the judge).
        let filtered: Vec<_> = candidates
            .into_iter()
            .filter(|c| c.score >= self.config.score_threshold)
            .collect();

        if filtered.is_empty() {
            debug!("All candidates fell below similarity threshold {}", self.config.score_threshold);
            return Ok(Vec::new());
        }

        let texts: Vec<String> = filtered.iter().map(|c| c.chunk.text.clone()).collect();
        let scores = self.scorer.score(query, &texts).await?;

        let mut results: Vec<RetrievalResult> = filtered
            .into_iter()
            .zip(scores)
            .map(|(candidate, rerank_score)| RetrievalResult {
                chunk_id: candidate.chunk.chunk_id,
                text: candidate.chunk.text,
                metadata: candidate.chunk.metadata,
                similarity: candidate.score,
                rerank_score,
            })
            .collect();

        // Stable sort over a similarity-ordered list: ties keep their
        // similarity rank.
        results.sort_by(|a, b| {
            b.rerank_score
                .partial_cmp(&a.rerank_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(self.config.n_final);

        if let Some(top) = results.first() {
            info!(
                "Reranked to {} results, top score {:.3}",
                results.len(),
                top.rerank_score
            );
        }

        Ok(results)
    }
}
