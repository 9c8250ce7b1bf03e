// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Line-delimited corpus loading
//!
//! Each corpus line is a JSON object with `_id`, `title`, and `text` (or
//! `body`) fields; everything else rides along as metadata. Malformed lines
//! are reported per-line so the pipeline can skip and count them.

use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;

use serde_json::{Map, Value};

use super::cleaning::ValidationError;
use super::types::RawRecord;

/// Fields lifted into `RawRecord` directly; the rest become metadata.
const RECORD_FIELDS: [&str; 4] = ["_id", "id", "title", "text"];

/// Streaming reader over a line-delimited corpus file.
pub struct CorpusReader {
    lines: Lines<BufReader<File>>,
    line_no: usize,
}

impl CorpusReader {
    /// Open a corpus file for reading.
    pub fn open(path: &Path) -> std::io::Result<Self> {
        let file = File::open(path)?;
        Ok(Self {
            lines: BufReader::new(file).lines(),
            line_no: 0,
        })
    }

    fn parse_line(&self, line: &str) -> Result<RawRecord, ValidationError> {
        let value: Value =
            serde_json::from_str(line).map_err(|_| ValidationError::MalformedLine)?;
        let object = value.as_object().ok_or(ValidationError::MalformedLine)?;

        let id = string_field(object, "_id")
            .or_else(|| string_field(object, "id"))
            .unwrap_or_default();
        let title = string_field(object, "title").unwrap_or_default();
        let body = string_field(object, "text")
            .or_else(|| string_field(object, "body"))
            .unwrap_or_default();

        let metadata: Map<String, Value> = object
            .iter()
            .filter(|(k, _)| !RECORD_FIELDS.contains(&k.as_str()) && k.as_str() != "body")
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        Ok(RawRecord {
            id,
            title,
            body,
            metadata,
        })
    }
}

impl Iterator for CorpusReader {
    type Item = Result<RawRecord, ValidationError>;

    /// Yields one record per non-empty line; I/O errors end the stream.
    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(_) => return None,
            };
            self.line_no += 1;
            if line.trim().is_empty() {
                continue;
            }
            return Some(self.parse_line(&line));
        }
    }
}

fn string_field(object: &Map<String, Value>, key: &str) -> Option<String> {
    object.get(key).map(|v| match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    })
}
