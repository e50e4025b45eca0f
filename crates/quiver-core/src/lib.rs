//! Core types and error definitions for the quiver semantic search engine.
//!
//! This crate provides the foundational types shared across all quiver crates,
//! including error handling, the record data model, and engine configuration.
//!
//! # Main types
//!
//! - [`QuiverError`]: Unified error enum for indexing, search, and persistence.
//! - [`QuiverResult`]: Convenience alias for `Result<T, QuiverError>`.
//! - [`SearchItem`]: Raw `(id, text, meta)` input handed to the indexer.
//! - [`Record`]: An indexed item carrying its embedding vector.
//! - [`SearchResult`]: A record scored against one query.
//! - [`SoftmaxSearchResult`]: A scored result with probability and confidence.
//! - [`EngineConfig`] / [`ProviderConfig`]: serde-backed configuration.

/// Engine and embedding provider configuration.
pub mod config;

pub use config::{EngineConfig, ProviderConfig};

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

// --- Error types ---

/// Top-level error type for the quiver engine.
#[derive(Debug, thiserror::Error)]
pub enum QuiverError {
    /// An index or search call was made before an embedding provider was installed.
    #[error("Embedding provider not initialized")]
    NotInitialized,

    /// The referenced record id is not present in the index.
    #[error("Item with id {0} not found")]
    NotFound(String),

    /// Malformed input: a snapshot entry without a vector, or an invalid option.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The embedding provider failed (network, non-2xx status, or malformed response).
    #[error("Provider error: {0}")]
    Provider(String),

    /// An error in configuration parsing or validation.
    #[error("Config error: {0}")]
    Config(String),

    /// A JSON serialization or deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A convenience `Result` alias using [`QuiverError`].
pub type QuiverResult<T> = Result<T, QuiverError>;

// --- Record types ---

/// Free-form metadata attached to an item.
pub type Meta = HashMap<String, serde_json::Value>;

/// An item to be embedded and indexed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchItem {
    /// Stable external key.
    pub id: String,
    /// Text handed to the embedding provider.
    pub text: String,
    /// Optional caller metadata, returned untouched with every result.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
}

impl SearchItem {
    /// Creates an item without metadata.
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            meta: None,
        }
    }

    /// Attaches metadata. Chainable builder method.
    pub fn with_meta(mut self, meta: Meta) -> Self {
        self.meta = Some(meta);
        self
    }
}

/// A single indexed unit: the item plus its embedding vector.
///
/// This is also the on-disk snapshot shape: `{id, text, vector, meta?}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Stable external key, unique within an index.
    pub id: String,
    /// The indexed text.
    pub text: String,
    /// Embedding vector; its dimensionality is whatever the provider returned.
    ///
    /// A missing, `null`, or non-numeric `vector` deserializes as empty, so a
    /// lenient load keeps the entry and a strict one can name it.
    #[serde(default, deserialize_with = "lenient_vector")]
    pub vector: Vec<f32>,
    /// Optional caller metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
}

impl Record {
    /// Builds a record from an item and the vector computed for its text.
    pub fn from_item(item: SearchItem, vector: Vec<f32>) -> Self {
        Self {
            id: item.id,
            text: item.text,
            vector,
            meta: item.meta,
        }
    }

    /// Whether the record carries a usable (non-empty, finite) vector.
    pub fn has_valid_vector(&self) -> bool {
        !self.vector.is_empty() && self.vector.iter().all(|v| v.is_finite())
    }
}

fn lenient_vector<'de, D>(deserializer: D) -> Result<Vec<f32>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    let serde_json::Value::Array(items) = value else {
        return Ok(Vec::new());
    };
    Ok(items
        .iter()
        .map(|v| v.as_f64().map(|x| x as f32))
        .collect::<Option<Vec<f32>>>()
        .unwrap_or_default())
}

/// A record scored against a query. The score is raw cosine similarity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Id of the matched record.
    pub id: String,
    /// Text of the matched record.
    pub text: String,
    /// Cosine similarity to the query, in `[-1, 1]`.
    pub score: f32,
    /// Metadata of the matched record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
}

impl SearchResult {
    /// Scores a record. Copies everything except the vector.
    pub fn from_record(record: &Record, score: f32) -> Self {
        Self {
            id: record.id.clone(),
            text: record.text.clone(),
            score,
            meta: record.meta.clone(),
        }
    }
}

/// A scored result extended with its softmax probability and the
/// distribution-wide confidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoftmaxSearchResult {
    /// The underlying cosine result.
    #[serde(flatten)]
    pub result: SearchResult,
    /// Softmax-normalized score over every candidate in the index.
    pub probability: f32,
    /// `1 - H / ln(n)`; identical for every result of one call.
    pub confidence: f32,
}

/// Output of the unified search entry point.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RankedResults {
    /// Cosine or MMR results.
    Scored(Vec<SearchResult>),
    /// Softmax results.
    Probabilistic(Vec<SoftmaxSearchResult>),
}

impl RankedResults {
    /// Number of results.
    pub fn len(&self) -> usize {
        match self {
            Self::Scored(r) => r.len(),
            Self::Probabilistic(r) => r.len(),
        }
    }

    /// Whether no result was returned.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Result ids in rank order.
    pub fn ids(&self) -> Vec<&str> {
        match self {
            Self::Scored(r) => r.iter().map(|x| x.id.as_str()).collect(),
            Self::Probabilistic(r) => r.iter().map(|x| x.result.id.as_str()).collect(),
        }
    }

    /// Drops probability information, keeping the plain cosine view.
    pub fn into_scored(self) -> Vec<SearchResult> {
        match self {
            Self::Scored(r) => r,
            Self::Probabilistic(r) => r.into_iter().map(|x| x.result).collect(),
        }
    }
}

// --- Strategy selection ---

/// Ranking strategy for the unified search entry point.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchStrategy {
    /// Plain cosine top-k.
    #[default]
    Cosine,
    /// Temperature softmax with entropy-derived confidence.
    Softmax,
    /// Maximal Marginal Relevance diversity selection.
    Mmr,
}

impl fmt::Display for SearchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Cosine => "cosine",
            Self::Softmax => "softmax",
            Self::Mmr => "mmr",
        };
        f.write_str(name)
    }
}

impl FromStr for SearchStrategy {
    type Err = QuiverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cosine" => Ok(Self::Cosine),
            "softmax" => Ok(Self::Softmax),
            "mmr" => Ok(Self::Mmr),
            other => Err(QuiverError::InvalidInput(format!(
                "unknown search strategy '{other}' (expected cosine, softmax or mmr)"
            ))),
        }
    }
}
