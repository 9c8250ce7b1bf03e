// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! End-to-end ingestion pipeline tests over a temp corpus and store

use std::io::Write;
use std::sync::Arc;

use tempfile::NamedTempFile;

use fabstir_qa_node::data::IngestionPipeline;
use fabstir_qa_node::vector::VectorStore;

use crate::support::{test_config, FlakyEmbedder, HashEmbedder};

fn corpus_file(lines: &[String]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    for line in lines {
        writeln!(file, "{}", line).unwrap();
    }
    file
}

fn record_line(id: usize) -> String {
    format!(
        r#"{{"_id": "rec-{id}", "title": "Question {id}", "text": "Answer body for record {id} with enough words to embed."}}"#
    )
}

#[tokio::test]
async fn test_single_record_yields_single_chunk() {
    // Scenario: one short Q&A record with chunk size 1000
    let corpus = corpus_file(&[
        r#"{"_id": "wp-1", "title": "How to install WordPress?", "text": "Download it from wordpress.org and run the installer."}"#.to_string(),
    ]);

    let config = test_config(32, 500, None);
    let store = Arc::new(VectorStore::in_memory(32));
    let pipeline = IngestionPipeline::new(&config, Arc::new(HashEmbedder::new(32)), store.clone());

    let stats = pipeline.run(corpus.path()).await.unwrap();

    assert_eq!(stats.records_processed, 1);
    assert_eq!(stats.records_skipped, 0);
    assert_eq!(stats.chunks_persisted, 1);
    assert_eq!(store.len().await, 1);
}

#[tokio::test]
async fn test_invalid_records_skipped_and_counted() {
    let corpus = corpus_file(&[
        record_line(1),
        "this line is not json".to_string(),
        r#"{"_id": "no-body", "title": "t", "text": ""}"#.to_string(),
        record_line(2),
    ]);

    let config = test_config(32, 500, None);
    let store = Arc::new(VectorStore::in_memory(32));
    let pipeline = IngestionPipeline::new(&config, Arc::new(HashEmbedder::new(32)), store.clone());

    let stats = pipeline.run(corpus.path()).await.unwrap();

    assert_eq!(stats.records_processed, 2);
    assert_eq!(stats.records_skipped, 2);
    assert_eq!(store.len().await, 2);
}

#[tokio::test]
async fn test_missing_corpus_is_fatal() {
    let config = test_config(32, 500, None);
    let store = Arc::new(VectorStore::in_memory(32));
    let pipeline = IngestionPipeline::new(&config, Arc::new(HashEmbedder::new(32)), store);

    let result = pipeline
        .run(std::path::Path::new("/nonexistent/corpus.jsonl"))
        .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_failed_batch_skipped_and_resumable() {
    // Scenario: 10 records, batch size 2 -> 5 batches; batch 3 fails.
    let lines: Vec<String> = (1..=10).map(record_line).collect();
    let corpus = corpus_file(&lines);

    let config = test_config(32, 2, None);
    let store = Arc::new(VectorStore::in_memory(32));

    let flaky = Arc::new(FlakyEmbedder::new(32, 3));
    let pipeline = IngestionPipeline::new(&config, flaky, store.clone());
    let stats = pipeline.run(corpus.path()).await.unwrap();

    assert_eq!(stats.failed_batches, 1);
    assert_eq!(stats.chunks_persisted, 8);
    assert_eq!(store.len().await, 8);

    // Re-run with a healthy embedder: the missing batch lands, the other
    // eight chunks are upserted in place without duplication.
    let pipeline = IngestionPipeline::new(&config, Arc::new(HashEmbedder::new(32)), store.clone());
    let stats = pipeline.run(corpus.path()).await.unwrap();

    assert_eq!(stats.failed_batches, 0);
    assert_eq!(store.len().await, 10);
}

#[tokio::test]
async fn test_snapshot_written_when_configured() {
    let dir = tempfile::tempdir().unwrap();
    let snapshot = dir.path().join("store.jsonl");

    let corpus = corpus_file(&[record_line(1), record_line(2)]);
    let config = test_config(32, 500, Some(snapshot.clone()));
    let store = Arc::new(VectorStore::open(32, Some(snapshot.clone())).unwrap());
    let pipeline = IngestionPipeline::new(&config, Arc::new(HashEmbedder::new(32)), store);

    pipeline.run(corpus.path()).await.unwrap();

    assert!(snapshot.exists());
    let reloaded = VectorStore::open(32, Some(snapshot)).unwrap();
    assert_eq!(reloaded.len().await, 2);
}
