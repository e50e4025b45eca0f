use crate::{QuiverError, QuiverResult};
use serde::{Deserialize, Serialize};

/// Tunables for a search engine instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Result count used when the caller does not pass one.
    #[serde(default = "default_limit")]
    pub default_limit: usize,
    /// Softmax temperature used when the caller does not pass one.
    #[serde(default = "default_temperature")]
    pub default_temperature: f32,
    /// MMR relevance/diversity balance used when the caller does not pass one.
    #[serde(default = "default_mmr_lambda")]
    pub default_mmr_lambda: f32,
    /// Neighbour count for query expansion.
    #[serde(default = "default_neighbors")]
    pub default_neighbors: usize,
    /// Upper bound on memoized query embeddings. `None` keeps every query
    /// for the lifetime of the engine.
    #[serde(default)]
    pub memo_capacity: Option<usize>,
    /// Reject snapshot imports containing records without a valid vector.
    #[serde(default)]
    pub strict_import: bool,
}

fn default_limit() -> usize {
    5
}

fn default_temperature() -> f32 {
    1.0
}

fn default_mmr_lambda() -> f32 {
    0.5
}

fn default_neighbors() -> usize {
    3
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            default_temperature: default_temperature(),
            default_mmr_lambda: default_mmr_lambda(),
            default_neighbors: default_neighbors(),
            memo_capacity: None,
            strict_import: false,
        }
    }
}

impl EngineConfig {
    /// Checks value ranges that serde cannot express.
    pub fn validate(&self) -> QuiverResult<()> {
        if !(self.default_temperature.is_finite() && self.default_temperature > 0.0) {
            return Err(QuiverError::Config(format!(
                "default_temperature must be > 0, got {}",
                self.default_temperature
            )));
        }
        if !(0.0..=1.0).contains(&self.default_mmr_lambda) {
            return Err(QuiverError::Config(format!(
                "default_mmr_lambda must be within [0, 1], got {}",
                self.default_mmr_lambda
            )));
        }
        if self.memo_capacity == Some(0) {
            return Err(QuiverError::Config(
                "memo_capacity must be at least 1 when set".to_string(),
            ));
        }
        Ok(())
    }
}

/// Which embedding provider to construct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ProviderConfig {
    /// In-process hashed bag-of-words embedding.
    Local {
        /// Output vector length.
        #[serde(default = "default_dimension")]
        dimension: usize,
        /// L2-normalize every output vector.
        #[serde(default = "default_normalize")]
        normalize: bool,
    },
    /// OpenAI-compatible `/v1/embeddings` endpoint.
    Http {
        /// Endpoint root; defaults to the OpenAI API.
        #[serde(default)]
        base_url: Option<String>,
        /// Embedding model id sent with every request.
        #[serde(default = "default_model")]
        model: String,
        /// Bearer token. The CLI falls back to `QUIVER_API_KEY` when absent.
        #[serde(default)]
        api_key: Option<String>,
        /// Requested output dimensionality, for models that support it.
        #[serde(default)]
        dimensions: Option<usize>,
    },
}

fn default_dimension() -> usize {
    256
}

fn default_normalize() -> bool {
    true
}

fn default_model() -> String {
    "text-embedding-3-small".to_string()
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self::Local {
            dimension: default_dimension(),
            normalize: default_normalize(),
        }
    }
}

impl ProviderConfig {
    /// Endpoint root for HTTP providers, `None` for local ones.
    pub fn base_url(&self) -> Option<&str> {
        match self {
            Self::Local { .. } => None,
            Self::Http { base_url, .. } => {
                Some(base_url.as_deref().unwrap_or("https://api.openai.com"))
            }
        }
    }
}
