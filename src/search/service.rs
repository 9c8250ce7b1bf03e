// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Search service orchestration
//!
//! Coordinates search providers, caching, and rate limiting. Providers are
//! tried in priority order; the first that answers wins. All failures stay
//! inside this module: the caller gets a `SearchError` it can treat as
//! "no web context available".

use std::time::Instant;
use tracing::{debug, info, warn};

use super::brave::BraveSearchProvider;
use super::cache::SearchCache;
use super::config::SearchConfig;
use super::duckduckgo::DuckDuckGoProvider;
use super::provider::SearchProvider;
use super::rate_limiter::SearchRateLimiter;
use super::types::{SearchError, SearchResponse};

/// Main search service that orchestrates providers, caching, and rate limiting
pub struct SearchService {
    providers: Vec<Box<dyn SearchProvider>>,
    cache: SearchCache,
    rate_limiter: SearchRateLimiter,
    config: SearchConfig,
}

impl SearchService {
    /// Create a new search service from configuration
    pub fn new(config: SearchConfig) -> Self {
        let mut providers: Vec<Box<dyn SearchProvider>> = Vec::new();

        // Add Brave if configured (priority 10)
        if let Some(ref api_key) = config.providers.brave_api_key {
            if !api_key.is_empty() {
                providers.push(Box::new(BraveSearchProvider::new(api_key.clone())));
                debug!("Brave Search provider enabled");
            }
        }

        // Always add DuckDuckGo as fallback (priority 50)
        providers.push(Box::new(DuckDuckGoProvider::new()));
        debug!("DuckDuckGo provider enabled (fallback)");

        // Sort by priority (lower = preferred)
        providers.sort_by_key(|p| p.priority());

        let cache = SearchCache::new(config.cache_ttl_secs, 1000);
        let rate_limiter = SearchRateLimiter::new(config.rate_limit_per_minute);

        Self {
            providers,
            cache,
            rate_limiter,
            config,
        }
    }

    /// Service with caller-supplied providers (used by tests and embeddings
    /// of the service behind custom providers)
    pub fn with_providers(config: SearchConfig, mut providers: Vec<Box<dyn SearchProvider>>) -> Self {
        providers.sort_by_key(|p| p.priority());
        let cache = SearchCache::new(config.cache_ttl_secs, 1000);
        let rate_limiter = SearchRateLimiter::new(config.rate_limit_per_minute);
        Self {
            providers,
            cache,
            rate_limiter,
            config,
        }
    }

    /// Perform a search
    ///
    /// # Arguments
    /// * `query` - The search query
    /// * `num_results` - Optional number of results (uses default if None)
    pub async fn search(
        &self,
        query: &str,
        num_results: Option<usize>,
    ) -> Result<SearchResponse, SearchError> {
        if !self.config.enabled {
            return Err(SearchError::SearchDisabled);
        }

        let num_results = num_results.unwrap_or(self.config.default_num_results);

        // Check cache first
        if let Some((results, provider)) = self.cache.get(query) {
            debug!("Cache hit for query: {}", query);
            return Ok(SearchResponse {
                query: query.to_string(),
                results,
                search_time_ms: 0,
                provider,
                cached: true,
            });
        }

        // Rate limit check
        self.rate_limiter.check()?;

        let start = Instant::now();

        // Try providers in order (by priority)
        for provider in &self.providers {
            if !provider.is_available() {
                continue;
            }

            debug!("Trying search provider: {}", provider.name());

            match provider.search(query, num_results).await {
                Ok(results) => {
                    let elapsed_ms = start.elapsed().as_millis() as u64;

                    // Cache successful results
                    self.cache.insert(query, &results, provider.name());

                    info!(
                        "Search complete: {} results from {} in {}ms",
                        results.len(),
                        provider.name(),
                        elapsed_ms
                    );

                    return Ok(SearchResponse {
                        query: query.to_string(),
                        results,
                        search_time_ms: elapsed_ms,
                        provider: provider.name().to_string(),
                        cached: false,
                    });
                }
                Err(e) => {
                    warn!(
                        "Search provider {} failed: {}, trying next",
                        provider.name(),
                        e
                    );
                    continue;
                }
            }
        }

        Err(SearchError::ProviderUnavailable {
            provider: "all".to_string(),
        })
    }

    /// Check if search is enabled
    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Get list of available provider names
    pub fn available_providers(&self) -> Vec<&str> {
        self.providers
            .iter()
            .filter(|p| p.is_available())
            .map(|p| p.name())
            .collect()
    }
}
