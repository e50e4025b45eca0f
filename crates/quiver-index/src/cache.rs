use quiver_core::SearchResult;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    query: String,
    limit: usize,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    expires_at: Instant,
    results: Vec<SearchResult>,
}

/// TTL cache of ranked result lists keyed by `(query text, limit)`.
///
/// Entries are not invalidated when the index changes; staleness is bounded
/// only by the TTL the caller picked. Expiry uses the tokio clock, so tests
/// can drive it with `tokio::time::pause`/`advance`.
#[derive(Debug, Default)]
pub struct ResultCache {
    entries: HashMap<CacheKey, CacheEntry>,
}

impl ResultCache {
    /// An empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached list for `(query, limit)` if present and not yet expired.
    pub fn get(&self, query: &str, limit: usize) -> Option<Vec<SearchResult>> {
        let key = CacheKey {
            query: query.to_string(),
            limit,
        };
        let now = Instant::now();
        self.entries
            .get(&key)
            .filter(|e| e.expires_at > now)
            .map(|e| e.results.clone())
    }

    /// Stores `results` for `ttl`, replacing any previous entry for the key.
    pub fn insert(&mut self, query: &str, limit: usize, ttl: Duration, results: Vec<SearchResult>) {
        self.purge_expired();
        let key = CacheKey {
            query: query.to_string(),
            limit,
        };
        self.entries.insert(
            key,
            CacheEntry {
                expires_at: Instant::now() + ttl,
                results,
            },
        );
    }

    /// Drops expired entries. Returns how many were removed.
    pub fn purge_expired(&mut self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, e| e.expires_at > now);
        before - self.entries.len()
    }

    /// Drops every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of stored entries, expired ones included until purged.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no entry is stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
