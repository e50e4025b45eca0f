use moka::policy::EvictionPolicy;
use moka::sync::Cache;
use std::collections::HashMap;

enum MemoStore {
    Unbounded(HashMap<String, Vec<f32>>),
    Bounded(Cache<String, Vec<f32>>),
}

/// Memo of query text to embedding vector.
///
/// Keys are byte-exact (case-sensitive) query strings. Unbounded by default,
/// so entries live as long as the engine. With a capacity set, entries go
/// into a `moka` cache with LRU eviction and a later lookup of an evicted
/// query re-embeds it.
pub struct QueryMemo {
    capacity: Option<usize>,
    store: MemoStore,
}

impl Default for QueryMemo {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl std::fmt::Debug for QueryMemo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryMemo")
            .field("capacity", &self.capacity)
            .field("len", &self.len())
            .finish()
    }
}

impl QueryMemo {
    /// A memo that never evicts.
    pub fn unbounded() -> Self {
        Self {
            capacity: None,
            store: MemoStore::Unbounded(HashMap::new()),
        }
    }

    /// A memo holding at most `capacity` queries (`None` = unbounded).
    pub fn with_capacity(capacity: Option<usize>) -> Self {
        match capacity {
            None => Self::unbounded(),
            Some(cap) => {
                let cap = cap.max(1);
                let cache = Cache::builder()
                    .max_capacity(cap as u64)
                    .eviction_policy(EvictionPolicy::lru())
                    .build();
                Self {
                    capacity: Some(cap),
                    store: MemoStore::Bounded(cache),
                }
            }
        }
    }

    /// Configured bound, if any.
    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// The memoized vector for `query`, marking it recently used.
    pub fn get(&self, query: &str) -> Option<Vec<f32>> {
        match &self.store {
            MemoStore::Unbounded(map) => map.get(query).cloned(),
            MemoStore::Bounded(cache) => cache.get(query),
        }
    }

    /// Remembers `vector` for `query`.
    pub fn insert(&mut self, query: &str, vector: Vec<f32>) {
        match &mut self.store {
            MemoStore::Unbounded(map) => {
                map.insert(query.to_string(), vector);
            }
            MemoStore::Bounded(cache) => {
                cache.insert(query.to_string(), vector);
                // Apply the eviction now so the bound holds between calls.
                cache.run_pending_tasks();
            }
        }
    }

    /// Number of memoized queries.
    pub fn len(&self) -> usize {
        match &self.store {
            MemoStore::Unbounded(map) => map.len(),
            MemoStore::Bounded(cache) => {
                cache.run_pending_tasks();
                cache.entry_count() as usize
            }
        }
    }

    /// Whether nothing is memoized.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forgets every query.
    pub fn clear(&mut self) {
        match &mut self.store {
            MemoStore::Unbounded(map) => map.clear(),
            MemoStore::Bounded(cache) => {
                cache.invalidate_all();
                cache.run_pending_tasks();
            }
        }
    }
}
