//! In-memory semantic search with pluggable embeddings and ranking strategies.
//!
//! Provides an ordered vector index, a local hashed embedding provider, an
//! optional OpenAI-compatible HTTP provider, cosine / softmax / MMR ranking,
//! query expansion, a TTL result cache, and JSON snapshot persistence.
//!
//! # Main types
//!
//! - [`SearchEngine`]: Owns one index plus its cache and query memo.
//! - [`SearchRequest`]: Builder returned by [`SearchEngine::search`].
//! - [`SearchOptions`]: Strategy and knobs for [`SearchEngine::search_with`].
//! - [`EmbeddingProvider`]: Trait for turning text into vectors.
//! - [`LocalEmbedding`]: Hashed bag-of-words provider with no external model.
//! - [`VectorIndex`]: Ordered record store with upsert-by-id semantics.

/// Time-bounded result cache keyed by `(query, limit)`.
pub mod cache;
/// Embedding provider trait and local implementations.
pub mod embedding;
/// The search engine handle tying index, provider, and caches together.
pub mod engine;
/// OpenAI-compatible HTTP embedding provider.
#[cfg(feature = "http-embeddings")]
pub mod http_embedding;
/// Ordered in-memory record store.
pub mod index;
/// Query embedding memo.
pub mod memo;
/// Options for the unified search entry point.
pub mod options;
/// JSON snapshot and item file I/O.
pub mod persistence;
/// Softmax, MMR, and query expansion.
pub mod ranking;
/// Cosine similarity and top-k ranking.
pub mod similarity;

pub use cache::ResultCache;
pub use embedding::{provider_from_config, EmbeddingProvider, FnEmbedding, LocalEmbedding};
pub use engine::{SearchEngine, SearchRequest};
#[cfg(feature = "http-embeddings")]
pub use http_embedding::HttpEmbedding;
pub use index::VectorIndex;
pub use memo::QueryMemo;
pub use options::{ResultFilter, SearchOptions};
pub use quiver_core::{
    EngineConfig, ProviderConfig, QuiverError, QuiverResult, RankedResults, Record, SearchItem,
    SearchResult, SearchStrategy, SoftmaxSearchResult,
};
