// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Retriever ordering and bound properties over an ingested corpus

use std::io::Write;
use std::sync::Arc;

use tempfile::NamedTempFile;

use fabstir_qa_node::config::RetrievalConfig;
use fabstir_qa_node::data::IngestionPipeline;
use fabstir_qa_node::retrieval::Retriever;
use fabstir_qa_node::vector::VectorStore;

use crate::support::{test_config, HashEmbedder, KeywordScorer};

const DIMENSION: usize = 32;

const TOPICS: [(&str, &str); 6] = [
    ("themes", "Themes control the look and feel of a WordPress site."),
    ("plugins", "Plugins extend WordPress with new functionality."),
    ("install", "To install WordPress, download it and run the installer."),
    ("backup", "Back up the database before upgrading WordPress."),
    ("permalinks", "Permalinks are configured under Settings."),
    ("security", "Keep WordPress updated to stay secure."),
];

async fn ingested_store(embedder: Arc<HashEmbedder>) -> Arc<VectorStore> {
    let mut corpus = NamedTempFile::new().unwrap();
    for (id, body) in TOPICS {
        writeln!(
            corpus,
            r#"{{"_id": "{id}", "title": "About {id}", "text": "{body}"}}"#
        )
        .unwrap();
    }

    let config = test_config(DIMENSION, 500, None);
    let store = Arc::new(VectorStore::in_memory(DIMENSION));
    IngestionPipeline::new(&config, embedder, store.clone())
        .run(corpus.path())
        .await
        .unwrap();
    store.ensure_index().await.unwrap();
    store
}

fn retriever(embedder: Arc<HashEmbedder>, store: Arc<VectorStore>, n_final: usize) -> Retriever {
    Retriever::new(
        embedder,
        Arc::new(KeywordScorer),
        store,
        RetrievalConfig {
            k_candidates: 10,
            n_final,
            score_threshold: -1.0,
        },
    )
}

#[tokio::test]
async fn test_rerank_scores_are_monotonically_descending() {
    let embedder = Arc::new(HashEmbedder::new(DIMENSION));
    let store = ingested_store(embedder.clone()).await;
    let r = retriever(embedder, store, 6);

    let results = r.retrieve("How do I install WordPress plugins?").await;
    assert!(!results.is_empty());
    for pair in results.windows(2) {
        assert!(pair[0].rerank_score >= pair[1].rerank_score);
    }
}

#[tokio::test]
async fn test_result_count_bounded_by_n_final() {
    let embedder = Arc::new(HashEmbedder::new(DIMENSION));
    let store = ingested_store(embedder.clone()).await;
    let r = retriever(embedder, store, 3);

    let results = r.retrieve("WordPress").await;
    assert!(results.len() <= 3);
}

#[tokio::test]
async fn test_fewer_chunks_than_n_final_returns_all() {
    let embedder = Arc::new(HashEmbedder::new(DIMENSION));
    let store = Arc::new(VectorStore::in_memory(DIMENSION));
    store
        .upsert(vec![fabstir_qa_node::vector::EmbeddedChunk {
            chunk_id: "only".to_string(),
            record_id: "only".to_string(),
            text: "The only chunk in the store.".to_string(),
            metadata: serde_json::json!({}),
            embedding: embedder.vector_for("The only chunk in the store."),
            created_at: chrono::Utc::now(),
        }])
        .await
        .unwrap();

    let r = retriever(embedder, store, 3);
    let results = r.retrieve("only chunk").await;
    assert_eq!(results.len(), 1);
}

#[tokio::test]
async fn test_best_match_ranks_first() {
    let embedder = Arc::new(HashEmbedder::new(DIMENSION));
    let store = ingested_store(embedder.clone()).await;
    let r = retriever(embedder, store, 3);

    let results = r.retrieve("How do I back up the database before upgrading?").await;
    assert!(!results.is_empty());
    assert!(results[0].text.contains("Back up the database"));
}
