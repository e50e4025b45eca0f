use async_trait::async_trait;
use quiver_core::{ProviderConfig, QuiverError, QuiverResult};
use std::collections::HashMap;
use std::sync::Arc;

/// Trait for computing text embeddings (vector representations).
///
/// Providers are expected to return comparable geometry on every call
/// (e.g. always L2-normalized). Nothing downstream verifies this; mixing
/// normalized and raw vectors in one index silently skews cosine scores.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Compute the embedding vector for a single text.
    async fn embed(&self, text: &str) -> QuiverResult<Vec<f32>>;

    /// Compute embeddings for a batch of texts in one call.
    ///
    /// Returns `Ok(None)` when the provider has no batch capability; the
    /// indexer then falls back to one [`embed`](Self::embed) call per text.
    async fn embed_batch(&self, _texts: &[&str]) -> QuiverResult<Option<Vec<Vec<f32>>>> {
        Ok(None)
    }
}

/// Adapts a plain synchronous function into a single-text provider.
///
/// ```
/// use quiver_index::FnEmbedding;
/// let provider = FnEmbedding::new(|text: &str| vec![text.len() as f32, 1.0]);
/// # let _ = provider;
/// ```
pub struct FnEmbedding<F> {
    func: F,
}

impl<F> FnEmbedding<F>
where
    F: Fn(&str) -> Vec<f32> + Send + Sync,
{
    /// Wraps `func`.
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

#[async_trait]
impl<F> EmbeddingProvider for FnEmbedding<F>
where
    F: Fn(&str) -> Vec<f32> + Send + Sync,
{
    async fn embed(&self, text: &str) -> QuiverResult<Vec<f32>> {
        Ok((self.func)(text))
    }
}

/// Local hashed bag-of-words embedding (no external model needed).
///
/// Words are hashed into a fixed number of buckets weighted by term
/// frequency. Batch-capable; output is L2-normalized unless configured raw.
pub struct LocalEmbedding {
    dimension: usize,
    normalize: bool,
}

impl LocalEmbedding {
    /// Normalized embedding with `dimension` buckets.
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
            normalize: true,
        }
    }

    /// Toggle L2 normalization. Chainable builder method.
    pub fn with_normalize(mut self, normalize: bool) -> Self {
        self.normalize = normalize;
        self
    }

    /// Output vector length.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed_one(&self, text: &str) -> QuiverResult<Vec<f32>> {
        if text.is_empty() {
            return Err(QuiverError::Provider("Cannot embed empty text".to_string()));
        }

        let mut vector = vec![0.0f32; self.dimension];

        let lowered = text.to_lowercase();
        let words: Vec<&str> = lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| w.len() > 1)
            .collect();

        let mut freq: HashMap<&str, f32> = HashMap::new();
        for word in &words {
            *freq.entry(word).or_insert(0.0) += 1.0;
        }

        let total = words.len() as f32;
        if total == 0.0 {
            return Ok(vector);
        }

        // Three buckets per word with decaying weights to soften collisions.
        for (word, count) in &freq {
            let tf = count / total;
            for (salt, weight) in [(0u8, 1.0f32), (1, 0.7), (2, 0.5)] {
                let bucket = fnv1a(word.as_bytes(), salt) as usize % self.dimension;
                vector[bucket] += tf * weight;
            }
        }

        if self.normalize {
            let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
            if norm > 0.0 {
                for v in &mut vector {
                    *v /= norm;
                }
            }
        }

        Ok(vector)
    }
}

impl Default for LocalEmbedding {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl EmbeddingProvider for LocalEmbedding {
    async fn embed(&self, text: &str) -> QuiverResult<Vec<f32>> {
        self.embed_one(text)
    }

    async fn embed_batch(&self, texts: &[&str]) -> QuiverResult<Option<Vec<Vec<f32>>>> {
        let vectors = texts
            .iter()
            .map(|t| self.embed_one(t))
            .collect::<QuiverResult<Vec<_>>>()?;
        Ok(Some(vectors))
    }
}

/// Builds the provider described by `config`.
pub fn provider_from_config(config: &ProviderConfig) -> QuiverResult<Arc<dyn EmbeddingProvider>> {
    match config {
        ProviderConfig::Local {
            dimension,
            normalize,
        } => Ok(Arc::new(
            LocalEmbedding::new(*dimension).with_normalize(*normalize),
        )),
        #[cfg(feature = "http-embeddings")]
        ProviderConfig::Http { .. } => Ok(Arc::new(
            crate::http_embedding::HttpEmbedding::from_config(config)?,
        )),
        #[cfg(not(feature = "http-embeddings"))]
        ProviderConfig::Http { .. } => Err(QuiverError::Config(
            "http provider requires the `http-embeddings` feature".to_string(),
        )),
    }
}

/// FNV-1a over `data` followed by one salt byte.
fn fnv1a(data: &[u8], salt: u8) -> u32 {
    let mut hash: u32 = 2166136261;
    for &byte in data.iter().chain(std::iter::once(&salt)) {
        hash ^= byte as u32;
        hash = hash.wrapping_mul(16777619);
    }
    hash
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn raw(dim: usize) -> LocalEmbedding {
        LocalEmbedding::new(dim).with_normalize(false)
    }

    fn close(a: &[f32], b: &[f32]) -> bool {
        a.len() == b.len() && a.iter().zip(b).all(|(x, y)| (x - y).abs() < 1e-6)
    }

    #[tokio::test]
    async fn test_raw_mass_is_bucket_weight_sum() {
        // Term frequencies sum to 1 and each word spreads 1.0 + 0.7 + 0.5
        // over its salted buckets, collisions or not.
        for text in ["vector", "alpha beta alpha", "one two three four five six"] {
            let v = raw(64).embed(text).await.unwrap();
            let mass: f32 = v.iter().sum();
            assert!((mass - 2.2).abs() < 1e-5, "{text}: {mass}");
        }
    }

    #[tokio::test]
    async fn test_raw_is_linear_in_term_frequency() {
        let emb = raw(512);
        let a = emb.embed("alpha").await.unwrap();
        let b = emb.embed("beta").await.unwrap();
        let ab = emb.embed("alpha beta").await.unwrap();
        let mixed: Vec<f32> = a.iter().zip(&b).map(|(x, y)| 0.5 * x + 0.5 * y).collect();
        assert!(close(&ab, &mixed));
    }

    #[tokio::test]
    async fn test_normalize_flag_only_rescales() {
        let text = "hashed buckets for semantic search";
        let plain = raw(96).embed(text).await.unwrap();
        let unit = LocalEmbedding::new(96).embed(text).await.unwrap();

        let norm: f32 = plain.iter().map(|x| x * x).sum::<f32>().sqrt();
        let rescaled: Vec<f32> = plain.iter().map(|x| x / norm).collect();
        assert!(close(&unit, &rescaled));
        assert!((norm - 1.0).abs() > 0.01, "raw output should not be unit length");
    }

    #[tokio::test]
    async fn test_tokens_ignore_case_and_punctuation() {
        let emb = LocalEmbedding::new(128);
        let a = emb.embed("Rust, RUST! rust?").await.unwrap();
        let b = emb.embed("rust rust rust").await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_single_char_tokens_embed_to_zero() {
        let v = LocalEmbedding::new(32).embed("a b c").await.unwrap();
        assert_eq!(v.len(), 32);
        assert!(v.iter().all(|x| *x == 0.0));
    }

    #[tokio::test]
    async fn test_empty_text_is_provider_error() {
        match LocalEmbedding::default().embed("").await {
            Err(QuiverError::Provider(msg)) => assert_eq!(msg, "Cannot embed empty text"),
            other => panic!("expected provider error, got {other:?}"),
        }
    }

    #[test]
    fn test_zero_dimension_floors_to_one() {
        assert_eq!(LocalEmbedding::new(0).dimension(), 1);
        assert_eq!(LocalEmbedding::default().dimension(), 256);
    }

    #[test]
    fn test_salts_pick_different_buckets() {
        let hashes: Vec<u32> = (0u8..3).map(|salt| fnv1a(b"quiver", salt)).collect();
        assert_ne!(hashes[0], hashes[1]);
        assert_ne!(hashes[1], hashes[2]);
        assert_eq!(fnv1a(b"quiver", 0), fnv1a(b"quiver", 0));
    }

    #[tokio::test]
    async fn test_batch_matches_single_calls() {
        let emb = LocalEmbedding::new(64);
        let texts = ["iPhone 15 Pro Max", "Samsung Galaxy S24", "MacBook Air"];
        let batch = emb.embed_batch(&texts).await.unwrap().unwrap();
        assert_eq!(batch.len(), texts.len());
        for (text, vector) in texts.iter().zip(&batch) {
            assert_eq!(vector, &emb.embed(text).await.unwrap());
        }
    }

    #[tokio::test]
    async fn test_batch_fails_whole_call() {
        let emb = LocalEmbedding::default();
        assert!(emb.embed_batch(&["ok", ""]).await.is_err());
    }

    #[tokio::test]
    async fn test_provider_from_local_config() {
        let cfg = ProviderConfig::Local {
            dimension: 32,
            normalize: false,
        };
        let provider = provider_from_config(&cfg).unwrap();
        let v = provider.embed("some text here").await.unwrap();
        assert_eq!(v.len(), 32);
        assert!((v.iter().sum::<f32>() - 2.2).abs() < 1e-5);
    }

    #[cfg(not(feature = "http-embeddings"))]
    #[test]
    fn test_http_config_needs_feature() {
        let cfg = ProviderConfig::Http {
            base_url: None,
            model: "m".into(),
            api_key: Some("k".into()),
            dimensions: None,
        };
        assert!(matches!(
            provider_from_config(&cfg),
            Err(QuiverError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_fn_embedding_has_no_batch() {
        let emb = FnEmbedding::new(|t: &str| vec![t.len() as f32]);
        assert_eq!(emb.embed("abc").await.unwrap(), vec![3.0]);
        assert!(emb.embed_batch(&["abc"]).await.unwrap().is_none());
    }
}
