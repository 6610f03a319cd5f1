//! TTL-bounded cache for graph query responses.
//!
//! The graph changes far less often than queries arrive, so identical
//! requests within the TTL window are answered from memory. Keys hash the
//! normalized request so casing and surrounding whitespace do not fragment
//! the cache.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use sha2::{Digest, Sha256};

use query::RetrievalRequest;

struct CachedResponse {
    value: serde_json::Value,
    inserted_at: Instant,
}

pub struct QueryCache {
    entries: DashMap<String, CachedResponse>,
    ttl: Duration,
    max_entries: usize,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl QueryCache {
    pub fn new(max_entries: usize, ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            max_entries,
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
        }
    }

    /// Deterministic cache key for a request.
    pub fn key_for(request: &RetrievalRequest) -> String {
        let canonical = format!(
            "{}|{}|{:?}|{:?}",
            request.query.trim().to_lowercase(),
            request.use_graph,
            request.max_graph_depth,
            request.top_k,
        );
        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        hex::encode(hasher.finalize())
    }

    pub fn get(&self, key: &str) -> Option<serde_json::Value> {
        if let Some(entry) = self.entries.get(key) {
            if entry.inserted_at.elapsed() <= self.ttl {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Some(entry.value.clone());
            }
        }
        // Expired entries are dropped on access rather than swept.
        self.entries
            .remove_if(key, |_, entry| entry.inserted_at.elapsed() > self.ttl);
        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    pub fn set(&self, key: String, value: serde_json::Value) {
        if self.entries.len() >= self.max_entries {
            // Simple eviction: drop a quarter of the entries when full, and
            // always at least one so tiny caches stay bounded.
            let to_remove: Vec<String> = self
                .entries
                .iter()
                .take(std::cmp::max(1, self.max_entries / 4))
                .map(|entry| entry.key().clone())
                .collect();
            for key in to_remove {
                self.entries.remove(&key);
            }
        }
        self.entries.insert(
            key,
            CachedResponse {
                value,
                inserted_at: Instant::now(),
            },
        );
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, serde::Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: usize,
    pub misses: usize,
}
