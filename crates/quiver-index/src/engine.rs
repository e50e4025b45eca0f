use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use quiver_core::{
    EngineConfig, QuiverError, QuiverResult, RankedResults, Record, SearchItem, SearchResult,
    SearchStrategy, SoftmaxSearchResult,
};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::cache::ResultCache;
use crate::embedding::EmbeddingProvider;
use crate::index::VectorIndex;
use crate::memo::QueryMemo;
use crate::options::{validate_temperature, ResultFilter, SearchOptions};
use crate::persistence;
use crate::ranking::{confidence, expand_query_vector, mmr_select, softmax, MmrCandidate};
use crate::similarity::{self, cosine_similarity};

/// Semantic search engine handle.
///
/// Owns one vector index together with its result cache and query memo.
/// Independent engines never share state. Each piece of state sits behind
/// its own lock and no lock is held across a provider call, so two calls
/// waiting on the provider interleave freely while every mutation runs as
/// one uninterrupted block. Overlapping writers resolve last-writer-wins,
/// and a search may observe the index between another call's embedding
/// phase and its mutation.
///
/// The cache and memo are not invalidated by index mutations. A cached
/// list stays served until its TTL expires, even after `clear()`.
pub struct SearchEngine {
    config: EngineConfig,
    provider: RwLock<Option<Arc<dyn EmbeddingProvider>>>,
    index: RwLock<VectorIndex>,
    cache: Mutex<ResultCache>,
    memo: Mutex<QueryMemo>,
}

impl Default for SearchEngine {
    fn default() -> Self {
        Self::build(EngineConfig::default())
    }
}

impl SearchEngine {
    /// Engine without a provider; call [`init_provider`](Self::init_provider)
    /// before indexing or searching.
    pub fn new(config: EngineConfig) -> QuiverResult<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    /// Engine with default configuration and `provider` already installed.
    pub fn with_provider(provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            provider: RwLock::new(Some(provider)),
            ..Self::build(EngineConfig::default())
        }
    }

    fn build(config: EngineConfig) -> Self {
        let memo = QueryMemo::with_capacity(config.memo_capacity);
        Self {
            config,
            provider: RwLock::new(None),
            index: RwLock::new(VectorIndex::new()),
            cache: Mutex::new(ResultCache::new()),
            memo: Mutex::new(memo),
        }
    }

    /// Installs (or swaps) the embedding provider.
    pub async fn init_provider(&self, provider: Arc<dyn EmbeddingProvider>) {
        *self.provider.write().await = Some(provider);
        info!("Embedding provider installed");
    }

    /// Engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Search options pre-filled with this engine's defaults.
    pub fn default_options(&self) -> SearchOptions {
        SearchOptions::from_config(&self.config)
    }

    async fn provider(&self) -> QuiverResult<Arc<dyn EmbeddingProvider>> {
        self.provider
            .read()
            .await
            .clone()
            .ok_or(QuiverError::NotInitialized)
    }

    // --- Indexing ---

    /// Embeds `items` and upserts them.
    ///
    /// Either every item is added or, on any provider failure, none is.
    pub async fn index(&self, items: Vec<SearchItem>) -> QuiverResult<()> {
        let provider = self.provider().await?;
        let records = embed_items(provider.as_ref(), items).await?;
        let count = records.len();
        self.index.write().await.upsert(records);
        info!(count, "Indexed items");
        Ok(())
    }

    /// Clears the index, then indexes `items`.
    ///
    /// Not atomic: if embedding fails after the clear, the index stays
    /// empty. Snapshot first, or use
    /// [`reindex_all_atomic`](Self::reindex_all_atomic).
    pub async fn reindex_all(&self, items: Vec<SearchItem>) -> QuiverResult<()> {
        self.provider().await?;
        self.index.write().await.clear();
        self.index(items).await
    }

    /// Embeds `items` off to the side and swaps them in only on success.
    pub async fn reindex_all_atomic(&self, items: Vec<SearchItem>) -> QuiverResult<()> {
        let provider = self.provider().await?;
        let records = embed_items(provider.as_ref(), items).await?;
        let count = records.len();
        self.index.write().await.replace_all(records);
        info!(count, "Reindexed all items");
        Ok(())
    }

    /// Reads `[{id, text, meta?}]` from `path` and reindexes everything.
    pub async fn load_items_from_file(&self, path: &Path) -> QuiverResult<()> {
        let items = persistence::load_items(path).await?;
        self.reindex_all(items).await
    }

    /// Removes the record with `id`. Absent ids are a no-op returning `false`.
    pub async fn remove(&self, id: &str) -> bool {
        self.index.write().await.remove(id)
    }

    /// Empties the index. Cache and memo are left as they are.
    pub async fn clear(&self) {
        self.index.write().await.clear();
    }

    /// Drops every cached result list.
    pub async fn clear_cache(&self) {
        self.cache.lock().await.clear();
    }

    /// Forgets every memoized query embedding.
    pub async fn clear_memo(&self) {
        self.memo.lock().await.clear();
    }

    /// Number of indexed records.
    pub async fn len(&self) -> usize {
        self.index.read().await.len()
    }

    /// Whether the index is empty.
    pub async fn is_empty(&self) -> bool {
        self.index.read().await.is_empty()
    }

    // --- Snapshots ---

    /// The full ordered record sequence.
    pub async fn export_snapshot(&self) -> Vec<Record> {
        self.index.read().await.export_snapshot()
    }

    /// Replaces the index with `records` verbatim.
    ///
    /// Strict mode (or `strict_import` in the config) rejects the whole
    /// import, before any mutation, if a record lacks a valid vector.
    pub async fn import_snapshot(&self, records: Vec<Record>, strict: bool) -> QuiverResult<()> {
        let strict = strict || self.config.strict_import;
        self.index.write().await.import_snapshot(records, strict)
    }

    /// Saves the index to `path` as pretty-printed JSON.
    pub async fn save(&self, path: &Path) -> QuiverResult<()> {
        let records = self.export_snapshot().await;
        persistence::save_snapshot(path, &records).await
    }

    /// Replaces the index with the snapshot stored at `path`.
    pub async fn load(&self, path: &Path, strict: bool) -> QuiverResult<()> {
        let strict = strict || self.config.strict_import;
        let records = persistence::load_snapshot(path, strict).await?;
        self.index.write().await.import_snapshot(records, false)
    }

    // --- Searching ---

    /// Starts a cosine search for the `limit` best matches of `query`.
    ///
    /// The returned request accepts a [`filter`](SearchRequest::filter) and
    /// runs via [`exec`](SearchRequest::exec) or
    /// [`cache_for`](SearchRequest::cache_for).
    pub fn search(&self, query: impl Into<String>, limit: usize) -> SearchRequest<'_> {
        SearchRequest {
            engine: self,
            query: query.into(),
            limit,
            filter: None,
        }
    }

    /// The `limit` records most similar to the stored record `id`, excluding
    /// the record itself. Uses the stored vector; nothing is re-embedded.
    pub async fn similar_to(&self, id: &str, limit: usize) -> QuiverResult<Vec<SearchResult>> {
        self.provider().await?;
        let index = self.index.read().await;
        let target = index
            .get(id)
            .ok_or_else(|| QuiverError::NotFound(id.to_string()))?;

        let mut scored: Vec<(&Record, f32)> = index
            .records()
            .iter()
            .filter(|r| r.id != id)
            .map(|r| (r, cosine_similarity(&r.vector, &target.vector)))
            .collect();
        scored.sort_by(|a, b| similarity::descending(a.1, b.1));
        scored.truncate(limit);

        Ok(scored
            .into_iter()
            .map(|(r, score)| SearchResult::from_record(r, score))
            .collect())
    }

    /// Ranks the whole index by softmax probability at `temperature`.
    ///
    /// Probabilities and confidence are computed over every indexed record,
    /// then the list is cut to `limit`.
    pub async fn search_with_probabilities(
        &self,
        query: &str,
        limit: usize,
        temperature: f32,
    ) -> QuiverResult<Vec<SoftmaxSearchResult>> {
        validate_temperature(temperature)?;
        let query_vec = self.embed_query(query).await?;
        let index = self.index.read().await;
        let mut ranked = softmax_rank(index.records(), &query_vec, temperature);
        ranked.truncate(limit);
        Ok(ranked)
    }

    /// Blends the query with its `neighbors` nearest records and re-ranks
    /// the whole index against the averaged vector.
    pub async fn search_with_expansion(
        &self,
        query: &str,
        limit: usize,
        neighbors: usize,
    ) -> QuiverResult<Vec<SearchResult>> {
        let query_vec = self.embed_query(query).await?;
        let index = self.index.read().await;
        if index.is_empty() {
            return Ok(Vec::new());
        }

        let nearest: Vec<&[f32]> = similarity::rank_records(index.records(), &query_vec)
            .into_iter()
            .take(neighbors)
            .map(|(r, _)| r.vector.as_slice())
            .collect();
        let expanded = expand_query_vector(&query_vec, &nearest);
        debug!(neighbors = nearest.len(), "Expanded query vector");

        Ok(similarity::top_k(index.records(), &expanded, limit))
    }

    /// Unified entry point dispatching on [`SearchOptions::strategy`].
    ///
    /// The filter sees the full candidate list before truncation, so up to
    /// `limit` matching results come back whenever that many exist. For MMR
    /// the filter narrows the candidate pool before selection.
    pub async fn search_with(
        &self,
        query: &str,
        options: SearchOptions,
    ) -> QuiverResult<RankedResults> {
        options.validate()?;
        let query_vec = self.embed_query(query).await?;
        let index = self.index.read().await;
        let records = index.records();

        let results = match options.strategy {
            SearchStrategy::Cosine => RankedResults::Scored(
                similarity::rank_by_similarity(records, &query_vec)
                    .into_iter()
                    .filter(|r| options.accepts(r))
                    .take(options.limit)
                    .collect(),
            ),
            SearchStrategy::Softmax => RankedResults::Probabilistic(
                softmax_rank(records, &query_vec, options.temperature)
                    .into_iter()
                    .filter(|r| options.accepts(&r.result))
                    .take(options.limit)
                    .collect(),
            ),
            SearchStrategy::Mmr => {
                let pool: Vec<MmrCandidate<'_>> = similarity::score_records(records, &query_vec)
                    .into_iter()
                    .map(|(r, score)| MmrCandidate {
                        result: SearchResult::from_record(r, score),
                        vector: r.vector.as_slice(),
                    })
                    .filter(|c| options.accepts(&c.result))
                    .collect();
                RankedResults::Scored(mmr_select(
                    pool,
                    &query_vec,
                    options.limit,
                    options.mmr_lambda,
                ))
            }
        };

        debug!(strategy = %options.strategy, count = results.len(), "Search complete");
        Ok(results)
    }

    /// Embedding for `query`, memoized by exact text.
    async fn embed_query(&self, query: &str) -> QuiverResult<Vec<f32>> {
        let provider = self.provider().await?;

        let memoized = self.memo.lock().await.get(query);
        if let Some(vector) = memoized {
            debug!(query_len = query.len(), "Query embedding memo hit");
            return Ok(vector);
        }

        let vector = provider.embed(query).await?;
        self.memo.lock().await.insert(query, vector.clone());
        Ok(vector)
    }

    async fn cosine_top_k(&self, query: &str, limit: usize) -> QuiverResult<Vec<SearchResult>> {
        let query_vec = self.embed_query(query).await?;
        let index = self.index.read().await;
        Ok(similarity::top_k(index.records(), &query_vec, limit))
    }
}

/// A pending cosine search built by [`SearchEngine::search`].
///
/// The filter runs after truncation to `limit`: a selective predicate can
/// return fewer than `limit` results even when more matching records exist
/// further down the ranking. Use [`SearchEngine::search_with`] to filter
/// before truncation.
pub struct SearchRequest<'a> {
    engine: &'a SearchEngine,
    query: String,
    limit: usize,
    filter: Option<ResultFilter>,
}

impl SearchRequest<'_> {
    /// Keeps only results matching `predicate`. Replaces any earlier filter.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&SearchResult) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Arc::new(predicate));
        self
    }

    /// Runs the search, serving an unexpired cached list when one exists.
    pub async fn exec(self) -> QuiverResult<Vec<SearchResult>> {
        self.engine.provider().await?;

        let cached = self.engine.cache.lock().await.get(&self.query, self.limit);
        if let Some(results) = cached {
            debug!(query_len = self.query.len(), limit = self.limit, "Result cache hit");
            return Ok(self.apply_filter(results));
        }

        let results = self.engine.cosine_top_k(&self.query, self.limit).await?;
        Ok(self.apply_filter(results))
    }

    /// Recomputes the ranking, caches the unfiltered list for `ttl` under
    /// `(query, limit)`, and returns the filtered view.
    pub async fn cache_for(self, ttl: Duration) -> QuiverResult<Vec<SearchResult>> {
        let results = self.engine.cosine_top_k(&self.query, self.limit).await?;
        self.engine
            .cache
            .lock()
            .await
            .insert(&self.query, self.limit, ttl, results.clone());
        debug!(
            query_len = self.query.len(),
            ttl_secs = ttl.as_secs_f64(),
            "Result list cached"
        );
        Ok(self.apply_filter(results))
    }

    fn apply_filter(&self, results: Vec<SearchResult>) -> Vec<SearchResult> {
        match &self.filter {
            Some(keep) => results.into_iter().filter(|r| keep(r)).collect(),
            None => results,
        }
    }
}

/// Embeds item texts (batch first, one by one as fallback) and pairs each
/// item with its vector.
async fn embed_items(
    provider: &dyn EmbeddingProvider,
    items: Vec<SearchItem>,
) -> QuiverResult<Vec<Record>> {
    if items.is_empty() {
        return Ok(Vec::new());
    }
    let vectors = {
        let texts: Vec<&str> = items.iter().map(|i| i.text.as_str()).collect();
        embed_texts(provider, &texts).await?
    };
    Ok(items
        .into_iter()
        .zip(vectors)
        .map(|(item, vector)| Record::from_item(item, vector))
        .collect())
}

async fn embed_texts(
    provider: &dyn EmbeddingProvider,
    texts: &[&str],
) -> QuiverResult<Vec<Vec<f32>>> {
    if let Some(vectors) = provider.embed_batch(texts).await? {
        if vectors.len() != texts.len() {
            warn!(
                expected = texts.len(),
                got = vectors.len(),
                "Batch embedding returned the wrong number of vectors"
            );
            return Err(QuiverError::Provider(format!(
                "batch embedding returned {} vectors for {} texts",
                vectors.len(),
                texts.len()
            )));
        }
        return Ok(vectors);
    }

    debug!(count = texts.len(), "Provider has no batch support, embedding one by one");
    let mut vectors = Vec::with_capacity(texts.len());
    for text in texts {
        vectors.push(provider.embed(text).await?);
    }
    Ok(vectors)
}

/// Every record with its softmax probability, most probable first.
fn softmax_rank(records: &[Record], query: &[f32], temperature: f32) -> Vec<SoftmaxSearchResult> {
    let scored = similarity::score_records(records, query);
    let scores: Vec<f32> = scored.iter().map(|(_, s)| *s).collect();
    let probs = softmax(&scores, temperature);
    let conf = confidence(&probs);

    let mut out: Vec<SoftmaxSearchResult> = scored
        .into_iter()
        .zip(probs)
        .map(|((r, score), p)| SoftmaxSearchResult {
            result: SearchResult::from_record(r, score),
            probability: p as f32,
            confidence: conf,
        })
        .collect();
    // Softmax is monotonic, so score order is probability order.
    out.sort_by(|a, b| similarity::descending(a.result.score, b.result.score));
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Maps a text to a fixed axis-aligned vector and counts calls.
    struct AxisEmbedding {
        calls: AtomicUsize,
        batch: bool,
    }

    impl AxisEmbedding {
        fn new(batch: bool) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                batch,
            }
        }

        fn vector(text: &str) -> Vec<f32> {
            match text {
                "x" => vec![1.0, 0.0, 0.0],
                "x-ish" => vec![0.9, 0.1, 0.0],
                "y" => vec![0.0, 1.0, 0.0],
                "z" => vec![0.0, 0.0, 1.0],
                _ => vec![0.5, 0.5, 0.5],
            }
        }
    }

    #[async_trait]
    impl EmbeddingProvider for AxisEmbedding {
        async fn embed(&self, text: &str) -> QuiverResult<Vec<f32>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if text == "boom" {
                return Err(QuiverError::Provider("boom".into()));
            }
            Ok(Self::vector(text))
        }

        async fn embed_batch(&self, texts: &[&str]) -> QuiverResult<Option<Vec<Vec<f32>>>> {
            if !self.batch {
                return Ok(None);
            }
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Some(texts.iter().map(|t| Self::vector(t)).collect()))
        }
    }

    fn items() -> Vec<SearchItem> {
        vec![
            SearchItem::new("1", "x"),
            SearchItem::new("2", "y"),
            SearchItem::new("3", "z"),
            SearchItem::new("4", "x-ish"),
        ]
    }

    #[tokio::test]
    async fn test_not_initialized() {
        let engine = SearchEngine::new(EngineConfig::default()).unwrap();
        assert!(matches!(
            engine.index(items()).await,
            Err(QuiverError::NotInitialized)
        ));
        assert!(matches!(
            engine.search("x", 2).exec().await,
            Err(QuiverError::NotInitialized)
        ));
        assert!(matches!(
            engine.similar_to("1", 2).await,
            Err(QuiverError::NotInitialized)
        ));
        // Store maintenance works without a provider.
        assert!(!engine.remove("1").await);
        engine.clear().await;
    }

    #[tokio::test]
    async fn test_init_provider_later() {
        let engine = SearchEngine::default();
        engine
            .init_provider(Arc::new(AxisEmbedding::new(true)))
            .await;
        engine.index(items()).await.unwrap();
        assert_eq!(engine.len().await, 4);
    }

    #[tokio::test]
    async fn test_batch_path_uses_one_call() {
        let provider = Arc::new(AxisEmbedding::new(true));
        let engine = SearchEngine::with_provider(provider.clone());
        engine.index(items()).await.unwrap();
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_sequential_fallback() {
        let provider = Arc::new(AxisEmbedding::new(false));
        let engine = SearchEngine::with_provider(provider.clone());
        engine.index(items()).await.unwrap();
        assert_eq!(provider.calls.load(Ordering::SeqCst), 4);

        let snapshot = engine.export_snapshot().await;
        assert_eq!(snapshot[1].vector, vec![0.0, 1.0, 0.0]);
    }

    #[tokio::test]
    async fn test_failed_index_adds_nothing() {
        let engine = SearchEngine::with_provider(Arc::new(AxisEmbedding::new(false)));
        engine.index(vec![SearchItem::new("a", "x")]).await.unwrap();

        let result = engine
            .index(vec![SearchItem::new("b", "y"), SearchItem::new("c", "boom")])
            .await;
        assert!(matches!(result, Err(QuiverError::Provider(_))));
        assert_eq!(engine.len().await, 1);
    }

    #[tokio::test]
    async fn test_reindex_all_is_not_atomic() {
        let engine = SearchEngine::with_provider(Arc::new(AxisEmbedding::new(false)));
        engine.index(items()).await.unwrap();
        let result = engine.reindex_all(vec![SearchItem::new("b", "boom")]).await;
        assert!(result.is_err());
        assert!(engine.is_empty().await);
    }

    #[tokio::test]
    async fn test_reindex_all_atomic_keeps_old_on_failure() {
        let engine = SearchEngine::with_provider(Arc::new(AxisEmbedding::new(false)));
        engine.index(items()).await.unwrap();
        let result = engine
            .reindex_all_atomic(vec![SearchItem::new("b", "boom")])
            .await;
        assert!(result.is_err());
        assert_eq!(engine.len().await, 4);

        engine
            .reindex_all_atomic(vec![SearchItem::new("n", "z")])
            .await
            .unwrap();
        assert_eq!(engine.len().await, 1);
    }

    #[tokio::test]
    async fn test_query_memo_avoids_reembedding() {
        let provider = Arc::new(AxisEmbedding::new(true));
        let engine = SearchEngine::with_provider(provider.clone());
        engine.index(items()).await.unwrap();
        let after_index = provider.calls.load(Ordering::SeqCst);

        engine.search("x", 2).exec().await.unwrap();
        engine.search("x", 3).exec().await.unwrap();
        engine.search_with_probabilities("x", 2, 1.0).await.unwrap();
        assert_eq!(provider.calls.load(Ordering::SeqCst), after_index + 1);

        engine.clear_memo().await;
        engine.search("x", 2).exec().await.unwrap();
        assert_eq!(provider.calls.load(Ordering::SeqCst), after_index + 2);
    }

    #[tokio::test]
    async fn test_bounded_memo_recomputes_evicted() {
        let config = EngineConfig {
            memo_capacity: Some(1),
            ..EngineConfig::default()
        };
        let provider = Arc::new(AxisEmbedding::new(true));
        let engine = SearchEngine::new(config).unwrap();
        engine.init_provider(provider.clone()).await;

        engine.search("x", 1).exec().await.unwrap();
        engine.search("y", 1).exec().await.unwrap();
        engine.search("x", 1).exec().await.unwrap();
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_similar_to() {
        let engine = SearchEngine::with_provider(Arc::new(AxisEmbedding::new(true)));
        engine.index(items()).await.unwrap();

        let similar = engine.similar_to("1", 2).await.unwrap();
        assert_eq!(similar.len(), 2);
        assert_eq!(similar[0].id, "4");
        assert!(similar.iter().all(|r| r.id != "1"));

        assert!(matches!(
            engine.similar_to("missing", 2).await,
            Err(QuiverError::NotFound(ref id)) if id == "missing"
        ));
    }

    #[tokio::test]
    async fn test_invalid_temperature() {
        let engine = SearchEngine::with_provider(Arc::new(AxisEmbedding::new(true)));
        assert!(matches!(
            engine.search_with_probabilities("x", 2, 0.0).await,
            Err(QuiverError::InvalidInput(_))
        ));
        let opts = engine.default_options().with_temperature(-1.0);
        assert!(engine.search_with("x", opts).await.is_err());
    }

    #[tokio::test]
    async fn test_search_with_empty_index() {
        let engine = SearchEngine::with_provider(Arc::new(AxisEmbedding::new(true)));
        for strategy in [SearchStrategy::Cosine, SearchStrategy::Softmax, SearchStrategy::Mmr] {
            let opts = engine.default_options().with_strategy(strategy);
            assert!(engine.search_with("x", opts).await.unwrap().is_empty());
        }
        assert!(engine.search_with_expansion("x", 3, 2).await.unwrap().is_empty());
        assert!(engine
            .search_with_probabilities("x", 3, 1.0)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_new_rejects_invalid_config() {
        let config = EngineConfig {
            default_temperature: 0.0,
            ..EngineConfig::default()
        };
        assert!(matches!(
            SearchEngine::new(config),
            Err(QuiverError::Config(_))
        ));
    }
}
