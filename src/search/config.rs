// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Configuration for web search functionality

use std::env;

/// Configuration for web search functionality
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Whether web search fallback is enabled
    pub enabled: bool,
    /// Provider-specific configuration
    pub providers: SearchProviderConfig,
    /// Cache TTL in seconds
    pub cache_ttl_secs: u64,
    /// Rate limit (requests per minute)
    pub rate_limit_per_minute: u32,
    /// Default number of results per search
    pub default_num_results: usize,
    /// Request timeout in milliseconds
    pub request_timeout_ms: u64,
}

/// Provider-specific configuration
#[derive(Debug, Clone)]
pub struct SearchProviderConfig {
    /// Brave Search API key
    pub brave_api_key: Option<String>,
}

impl SearchConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            // Web search enabled by default (DuckDuckGo requires no API key)
            // Set WEB_SEARCH_ENABLED=false to disable
            enabled: env::var("WEB_SEARCH_ENABLED")
                .map(|v| v.to_lowercase() != "false")
                .unwrap_or(true),
            providers: SearchProviderConfig {
                brave_api_key: env::var("BRAVE_API_KEY").ok(),
            },
            cache_ttl_secs: env::var("SEARCH_CACHE_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3600),
            rate_limit_per_minute: env::var("SEARCH_RATE_LIMIT_PER_MINUTE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(60),
            default_num_results: 5,
            request_timeout_ms: 10000,
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        // DuckDuckGo is always available, so enabling without API keys is fine
        if self.cache_ttl_secs == 0 {
            return Err("Cache TTL must be greater than 0".to_string());
        }
        if self.rate_limit_per_minute == 0 {
            return Err("Rate limit must be greater than 0".to_string());
        }
        Ok(())
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            enabled: true, // DuckDuckGo needs no API key
            providers: SearchProviderConfig {
                brave_api_key: None,
            },
            cache_ttl_secs: 3600,
            rate_limit_per_minute: 60,
            default_num_results: 5,
            request_timeout_ms: 10000,
        }
    }
}
