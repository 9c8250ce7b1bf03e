// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Core types for web search functionality

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single search result from a web search provider
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    /// Title of the search result
    pub title: String,
    /// URL of the search result
    pub url: String,
    /// Snippet/description of the search result
    pub snippet: String,
    /// Source provider (e.g., "brave", "duckduckgo")
    pub source: String,
}

/// Response from a search operation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    /// The original search query
    pub query: String,
    /// List of search results
    pub results: Vec<SearchResult>,
    /// Time taken for the search in milliseconds
    pub search_time_ms: u64,
    /// Provider that returned the results
    pub provider: String,
    /// Whether the result was from cache
    pub cached: bool,
}

impl SearchResponse {
    /// Render results as generation context.
    ///
    /// One `Title / Content / URL` block per result, blank-line separated,
    /// which is the shape the answer prompt expects.
    pub fn to_context(&self) -> String {
        self.results
            .iter()
            .map(|r| format!("Title: {}\nContent: {}\nURL: {}", r.title, r.snippet, r.url))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// Errors that can occur during search operations
#[derive(Debug, Error)]
pub enum SearchError {
    /// Rate limited by the search provider
    #[error("Rate limited, retry after {retry_after_secs}s")]
    RateLimited {
        /// Seconds to wait before retrying
        retry_after_secs: u64,
    },

    /// API error from the search provider
    #[error("Search API error: {status} - {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Error message
        message: String,
    },

    /// Search request timed out
    #[error("Search timeout after {timeout_ms}ms")]
    Timeout {
        /// Timeout duration in milliseconds
        timeout_ms: u64,
    },

    /// Search provider is unavailable
    #[error("Provider unavailable: {provider}")]
    ProviderUnavailable {
        /// Name of the unavailable provider
        provider: String,
    },

    /// No API key configured for the provider
    #[error("No API key configured for {provider}")]
    NoApiKey {
        /// Name of the provider missing API key
        provider: String,
    },

    /// Search is disabled on this node
    #[error("Search disabled on this node")]
    SearchDisabled,
}
