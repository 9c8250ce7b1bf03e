// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Boundary-aware chunking with overlap
//!
//! Splits a cleaned record body into overlapping windows. Cuts prefer
//! paragraph breaks, then sentence ends, then any whitespace, and fall back
//! to a hard character cut when no boundary fits. Cuts never land inside a
//! fenced code block unless that block alone exceeds the chunk size.
//!
//! Offsets are character offsets into the cleaned body. Chunks cover the
//! body with no gaps: each chunk after the first starts `overlap_size`
//! characters before the previous chunk's end (clamped when the previous
//! chunk is shorter than the overlap).

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

use crate::config::ChunkingConfig;

use super::types::{Chunk, RawRecord};

static FENCED_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```.*?```").expect("valid regex"));

/// Splits cleaned records into overlapping chunks under a size policy.
#[derive(Debug, Clone)]
pub struct Chunker {
    max_chunk_size: usize,
    overlap_size: usize,
}

impl Chunker {
    /// Create a chunker from the chunking policy.
    ///
    /// An overlap at or above the chunk size is clamped to `size - 1` so
    /// every chunk makes forward progress.
    pub fn new(config: &ChunkingConfig) -> Self {
        let max_chunk_size = config.max_chunk_size.max(1);
        let overlap_size = config.overlap_size.min(max_chunk_size.saturating_sub(1));
        Self {
            max_chunk_size,
            overlap_size,
        }
    }

    /// Split a cleaned record into ordered chunks.
    ///
    /// A body no longer than the chunk size yields exactly one chunk with
    /// no overlap.
    pub fn chunk(&self, record: &RawRecord) -> Vec<Chunk> {
        let text = Text::new(&record.body);
        if text.len() == 0 {
            return Vec::new();
        }

        let fences = fence_ranges(&text);
        let spans = self.split_spans(&text, &fences);
        let total = spans.len();

        spans
            .into_iter()
            .enumerate()
            .map(|(idx, span)| {
                let mut metadata = record.metadata.clone();
                metadata.insert(
                    "original_title".to_string(),
                    Value::String(record.title.clone()),
                );
                metadata.insert("chunk_index".to_string(), Value::from(idx));
                metadata.insert("total_chunks".to_string(), Value::from(total));

                Chunk {
                    chunk_id: Chunk::fingerprint(&record.id, span.start),
                    record_id: record.id.clone(),
                    title: record.title.clone(),
                    body: text.slice(span.clone()).to_string(),
                    start_offset: span.start,
                    end_offset: span.end,
                    metadata,
                }
            })
            .collect()
    }

    /// Compute chunk spans in character offsets.
    fn split_spans(&self, text: &Text, fences: &[Range<usize>]) -> Vec<Range<usize>> {
        let len = text.len();
        if len <= self.max_chunk_size {
            return vec![0..len];
        }

        let mut spans: Vec<Range<usize>> = Vec::new();
        let mut start = 0usize;

        loop {
            let ideal_end = start + self.max_chunk_size;
            if ideal_end >= len {
                spans.push(start..len);
                break;
            }

            let end = self
                .find_cut(text, fences, start, ideal_end)
                .unwrap_or(ideal_end);
            spans.push(start..end);

            if end >= len {
                break;
            }
            // Next window re-reads the overlap tail; clamp keeps progress
            // when the previous span was shorter than the overlap.
            start = end.saturating_sub(self.overlap_size).max(start + 1);
        }

        spans
    }

    /// Find the best cut position in `(start, ideal_end]`.
    ///
    /// Preference: paragraph break, sentence end, whitespace; the furthest
    /// valid boundary of the best class wins. Returns None when no boundary
    /// is usable, in which case the caller hard-cuts at `ideal_end` (a fence
    /// bigger than the chunk size ends up split this way).
    fn find_cut(
        &self,
        text: &Text,
        fences: &[Range<usize>],
        start: usize,
        ideal_end: usize,
    ) -> Option<usize> {
        let mut best_sentence = None;
        let mut best_whitespace = None;

        for pos in (start + 1..=ideal_end).rev() {
            if cuts_fence(fences, pos, self.max_chunk_size) {
                continue;
            }
            if text.is_paragraph_break(pos) {
                return Some(pos);
            }
            if best_sentence.is_none() && text.is_sentence_end(pos) {
                best_sentence = Some(pos);
            }
            if best_whitespace.is_none() && text.is_whitespace_boundary(pos) {
                best_whitespace = Some(pos);
            }
        }

        best_sentence.or(best_whitespace).or_else(|| {
            // No boundary at all: cut right before a fitting fence rather
            // than inside it.
            fences
                .iter()
                .find(|f| f.contains(&ideal_end) && f.end - f.start <= self.max_chunk_size)
                .map(|f| f.start)
                .filter(|cut| *cut > start)
        })
    }
}

/// A cut at `pos` is invalid while it sits strictly inside a fence that
/// would itself fit in one chunk.
fn cuts_fence(fences: &[Range<usize>], pos: usize, max_chunk_size: usize) -> bool {
    fences
        .iter()
        .any(|f| pos > f.start && pos < f.end && f.end - f.start <= max_chunk_size)
}

/// Fenced code block ranges in character offsets.
fn fence_ranges(text: &Text) -> Vec<Range<usize>> {
    FENCED_CODE
        .find_iter(text.raw)
        .map(|m| text.char_of_byte(m.start())..text.char_of_byte(m.end()))
        .collect()
}

/// Character-indexed view over a string slice.
///
/// Chunk sizes are defined in characters; this keeps the scanning logic in
/// character space while slicing stays on valid byte boundaries.
struct Text<'a> {
    raw: &'a str,
    /// Byte offset of each character boundary, plus the trailing length
    bounds: Vec<usize>,
    chars: Vec<char>,
}

impl<'a> Text<'a> {
    fn new(raw: &'a str) -> Self {
        let mut bounds: Vec<usize> = raw.char_indices().map(|(i, _)| i).collect();
        bounds.push(raw.len());
        Self {
            raw,
            bounds,
            chars: raw.chars().collect(),
        }
    }

    fn len(&self) -> usize {
        self.chars.len()
    }

    fn slice(&self, span: Range<usize>) -> &'a str {
        &self.raw[self.bounds[span.start]..self.bounds[span.end]]
    }

    fn char_of_byte(&self, byte: usize) -> usize {
        self.bounds.partition_point(|b| *b < byte)
    }

    /// True when the two characters before `pos` are a blank line.
    fn is_paragraph_break(&self, pos: usize) -> bool {
        pos >= 2 && self.chars[pos - 1] == '\n' && self.chars[pos - 2] == '\n'
    }

    /// True when `pos` follows sentence punctuation and precedes whitespace.
    fn is_sentence_end(&self, pos: usize) -> bool {
        if pos == 0 {
            return false;
        }
        let before = self.chars[pos - 1];
        let after_ok = pos == self.len() || self.chars[pos].is_whitespace();
        matches!(before, '.' | '!' | '?') && after_ok
    }

    fn is_whitespace_boundary(&self, pos: usize) -> bool {
        pos > 0 && self.chars[pos - 1].is_whitespace()
    }
}
