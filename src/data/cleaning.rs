// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Text cleaning for technical Q&A corpora
//!
//! Normalizes whitespace and strips HTML outside code spans while keeping
//! fenced code blocks, PHP snippets, and inline code byte-for-byte intact.
//! Code spans are swapped for placeholders before any normalization runs
//! and restored afterwards, so cleaning never touches their contents.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use super::types::RawRecord;

static PHP_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<\?php.*?\?>").expect("valid regex"));
static FENCED_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```.*?```").expect("valid regex"));
static INLINE_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"`[^`\n]+`").expect("valid regex"));
static HTML_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]+>").expect("valid regex"));
static NUMERIC_ENTITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&#(x[0-9a-fA-F]{1,6}|[0-9]{1,7});").expect("valid regex"));
static SPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t]*\t[ \t]*| {2,}").expect("valid regex"));
static NEWLINE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

/// Malformed or empty record; skipped and counted, never fatal to a run.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Input text is empty or whitespace-only
    #[error("empty or non-text input")]
    EmptyText,

    /// Corpus line is not a JSON object
    #[error("line is not a JSON object")]
    MalformedLine,

    /// A required record field is missing or blank
    #[error("record {id}: missing or blank field `{field}`")]
    MissingField { id: String, field: String },

    /// The record body cleaned down to nothing
    #[error("record {id}: body is empty after cleaning")]
    EmptyAfterCleaning { id: String },
}

/// Clean raw corpus text.
///
/// Removes HTML tags and decodes entities, strips non-printable control
/// characters, and collapses redundant whitespace, all while leaving code
/// spans untouched. Idempotent: `clean_text(clean_text(x)) == clean_text(x)`.
pub fn clean_text(text: &str) -> Result<String, ValidationError> {
    if text.trim().is_empty() {
        return Err(ValidationError::EmptyText);
    }

    let (protected, blocks) = protect_code_spans(text, false);

    // Strip + decode to a fixpoint: decoding can surface markup that was
    // entity-escaped, and a second pass must not see anything new.
    let mut current = protected;
    for _ in 0..4 {
        let next = decode_entities_once(&HTML_TAG.replace_all(&current, ""));
        if next == current {
            break;
        }
        current = next;
    }

    let restored = restore_code_spans(current, &blocks);
    Ok(normalize_whitespace(&restored))
}

/// Check that a record carries usable id, title, and body text.
pub fn validate_record(record: &RawRecord) -> Result<(), ValidationError> {
    for (field, value) in [
        ("id", &record.id),
        ("title", &record.title),
        ("body", &record.body),
    ] {
        if value.trim().is_empty() {
            return Err(ValidationError::MissingField {
                id: record.id.clone(),
                field: field.to_string(),
            });
        }
    }
    match clean_text(&record.body) {
        Ok(cleaned) if !cleaned.is_empty() => Ok(()),
        _ => Err(ValidationError::EmptyAfterCleaning {
            id: record.id.clone(),
        }),
    }
}

/// Collapse redundant whitespace outside code spans.
///
/// Runs of spaces/tabs become a single space, 3+ newlines become a
/// paragraph break, and control characters other than newline are removed.
fn normalize_whitespace(text: &str) -> String {
    let (protected, blocks) = protect_code_spans(text, true);

    let no_controls: String = protected
        .chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect();
    let spaces = SPACE_RUN.replace_all(&no_controls, " ");
    let newlines = NEWLINE_RUN.replace_all(&spaces, "\n\n");

    restore_code_spans(newlines.into_owned(), &blocks)
        .trim()
        .to_string()
}

/// Swap code spans for placeholders so normalization cannot touch them.
///
/// Returns the protected text plus the (placeholder, original) pairs needed
/// to restore it. PHP blocks and fenced blocks are always protected; inline
/// code only when `include_inline` is set (tag stripping must still see
/// HTML that happens to sit between backticks in prose).
fn protect_code_spans(text: &str, include_inline: bool) -> (String, Vec<(String, String)>) {
    let mut blocks: Vec<(String, String)> = Vec::new();
    let mut out = text.to_string();

    for pattern in [&*PHP_CODE, &*FENCED_CODE] {
        out = protect_with(pattern, out, &mut blocks);
    }
    if include_inline {
        out = protect_with(&INLINE_CODE, out, &mut blocks);
    }

    (out, blocks)
}

fn protect_with(pattern: &Regex, text: String, blocks: &mut Vec<(String, String)>) -> String {
    pattern
        .replace_all(&text, |caps: &regex::Captures| {
            let placeholder = format!("___CODE_BLOCK_{}___", blocks.len());
            blocks.push((placeholder.clone(), caps[0].to_string()));
            placeholder
        })
        .into_owned()
}

fn restore_code_spans(mut text: String, blocks: &[(String, String)]) -> String {
    // Restore in reverse so nested protections unwind in order
    for (placeholder, code) in blocks.iter().rev() {
        text = text.replace(placeholder, code);
    }
    text
}

fn decode_entities_once(text: &str) -> String {
    let numeric = NUMERIC_ENTITY.replace_all(text, |caps: &regex::Captures| {
        let body = &caps[1];
        let code = if let Some(hex) = body.strip_prefix('x') {
            u32::from_str_radix(hex, 16).ok()
        } else {
            body.parse::<u32>().ok()
        };
        code.and_then(char::from_u32)
            .map(String::from)
            .unwrap_or_else(|| caps[0].to_string())
    });

    // `&amp;` last so it cannot manufacture new entities mid-pass
    numeric
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}
