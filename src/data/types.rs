// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Core record types for the ingestion pipeline

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

/// One raw question/answer record parsed from a corpus line.
///
/// Discarded after transformation; only chunks survive to the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawRecord {
    /// Record identifier from the corpus
    pub id: String,
    /// Question / title text
    pub title: String,
    /// Answer / body text
    pub body: String,
    /// All corpus fields that are not id/title/body
    pub metadata: Map<String, Value>,
}

/// A bounded contiguous span of a cleaned document, the unit of embedding
/// and retrieval.
///
/// `start_offset`/`end_offset` are character offsets into the cleaned body
/// of the source record; `body` is exactly that span. Immutable once
/// persisted; re-ingestion supersedes via the deterministic `chunk_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Deterministic fingerprint of source id + start offset
    pub chunk_id: String,
    /// Identifier of the source record
    pub record_id: String,
    /// Title of the source record
    pub title: String,
    /// The raw text span
    pub body: String,
    /// Start offset in characters into the cleaned document
    pub start_offset: usize,
    /// End offset in characters into the cleaned document
    pub end_offset: usize,
    /// Record metadata plus chunk position fields
    pub metadata: Map<String, Value>,
}

impl Chunk {
    /// Compute the deterministic chunk fingerprint.
    ///
    /// SHA-256 over `"<record_id>:<start_offset>"`, hex-encoded. Stable
    /// across re-runs, which makes store upserts idempotent.
    pub fn fingerprint(record_id: &str, start_offset: usize) -> String {
        let mut hasher = Sha256::new();
        hasher.update(record_id.as_bytes());
        hasher.update(b":");
        hasher.update(start_offset.to_string().as_bytes());
        hex_encode(&hasher.finalize())
    }

    /// Text sent to the embedding service and stored for retrieval.
    ///
    /// The record title is prepended so short spans keep enough context to
    /// embed and rerank well.
    pub fn embedding_text(&self) -> String {
        format!("Title: {}\nContent: {}", self.title, self.body)
    }

    /// Number of characters in the span
    pub fn len_chars(&self) -> usize {
        self.end_offset - self.start_offset
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push_str(&format!("{:02x}", b));
    }
    out
}
