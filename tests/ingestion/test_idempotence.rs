// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Re-ingestion convergence: running twice over the same corpus leaves the
//! store with the same chunk ids and no duplicates

use std::io::Write;
use std::sync::Arc;

use tempfile::NamedTempFile;

use fabstir_qa_node::data::IngestionPipeline;
use fabstir_qa_node::vector::VectorStore;

use crate::support::{test_config, HashEmbedder};

fn corpus() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    let long_body = "This paragraph repeats to force multiple chunks. ".repeat(60);
    writeln!(
        file,
        r#"{{"_id": "long-1", "title": "A long question", "text": "{}"}}"#,
        long_body.trim()
    )
    .unwrap();
    writeln!(
        file,
        r#"{{"_id": "short-1", "title": "A short question", "text": "A short answer."}}"#
    )
    .unwrap();
    file
}

#[tokio::test]
async fn test_reingest_converges_to_same_store() {
    let corpus = corpus();
    let config = test_config(32, 500, None);
    let store = Arc::new(VectorStore::in_memory(32));

    let pipeline = IngestionPipeline::new(&config, Arc::new(HashEmbedder::new(32)), store.clone());

    pipeline.run(corpus.path()).await.unwrap();
    let first_ids = {
        let mut ids = store.chunk_ids().await;
        ids.sort();
        ids
    };
    let first_len = store.len().await;
    assert!(first_len > 2, "long record should produce several chunks");

    pipeline.run(corpus.path()).await.unwrap();
    let second_ids = {
        let mut ids = store.chunk_ids().await;
        ids.sort();
        ids
    };

    assert_eq!(store.len().await, first_len, "no duplicates on re-ingest");
    assert_eq!(first_ids, second_ids, "identical chunk id set");
}

#[tokio::test]
async fn test_reingest_into_fresh_store_matches() {
    let corpus = corpus();
    let config = test_config(32, 500, None);
    let embedder = Arc::new(HashEmbedder::new(32));

    let store_a = Arc::new(VectorStore::in_memory(32));
    IngestionPipeline::new(&config, embedder.clone(), store_a.clone())
        .run(corpus.path())
        .await
        .unwrap();

    let store_b = Arc::new(VectorStore::in_memory(32));
    IngestionPipeline::new(&config, embedder, store_b.clone())
        .run(corpus.path())
        .await
        .unwrap();

    let mut ids_a = store_a.chunk_ids().await;
    let mut ids_b = store_b.chunk_ids().await;
    ids_a.sort();
    ids_b.sort();
    assert_eq!(ids_a, ids_b);
}
