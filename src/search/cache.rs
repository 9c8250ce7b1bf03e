// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! TTL-based search result caching

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use super::types::SearchResult;

/// TTL-based cache for search results
pub struct SearchCache {
    cache: RwLock<HashMap<String, CachedEntry>>,
    ttl: Duration,
    max_entries: usize,
}

struct CachedEntry {
    results: Vec<SearchResult>,
    provider: String,
    inserted_at: Instant,
}

impl SearchCache {
    /// Create a new search cache
    ///
    /// # Arguments
    /// * `ttl_secs` - Time-to-live for cache entries in seconds
    /// * `max_entries` - Maximum number of entries to store
    pub fn new(ttl_secs: u64, max_entries: usize) -> Self {
        Self {
            cache: RwLock::new(HashMap::new()),
            ttl: Duration::from_secs(ttl_secs),
            max_entries,
        }
    }

    /// Get cached results for a query
    ///
    /// Returns None if not found or expired
    pub fn get(&self, query: &str) -> Option<(Vec<SearchResult>, String)> {
        let cache = self.cache.read().ok()?;
        let entry = cache.get(&Self::cache_key(query))?;

        if entry.inserted_at.elapsed() > self.ttl {
            return None; // Expired
        }

        Some((entry.results.clone(), entry.provider.clone()))
    }

    /// Insert results into cache
    pub fn insert(&self, query: &str, results: &[SearchResult], provider: &str) {
        let mut cache = match self.cache.write() {
            Ok(c) => c,
            Err(_) => return,
        };

        // Evict oldest if at capacity
        if cache.len() >= self.max_entries {
            if let Some(oldest) = cache
                .iter()
                .min_by_key(|(_, e)| e.inserted_at)
                .map(|(k, _)| k.clone())
            {
                cache.remove(&oldest);
            }
        }

        cache.insert(
            Self::cache_key(query),
            CachedEntry {
                results: results.to_vec(),
                provider: provider.to_string(),
                inserted_at: Instant::now(),
            },
        );
    }

    /// Clear all cache entries
    pub fn clear(&self) {
        if let Ok(mut cache) = self.cache.write() {
            cache.clear();
        }
    }

    /// Number of entries currently cached (including expired, not yet evicted)
    pub fn len(&self) -> usize {
        self.cache.read().map(|c| c.len()).unwrap_or(0)
    }

    /// True when nothing is cached
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn cache_key(query: &str) -> String {
        query.trim().to_lowercase()
    }
}
