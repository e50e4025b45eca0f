use crate::embedding::EmbeddingProvider;
use async_trait::async_trait;
use quiver_core::{ProviderConfig, QuiverError, QuiverResult};
use serde::Deserialize;
use tracing::debug;

/// OpenAI-compatible embeddings backend.
///
/// Works with OpenAI and any provider exposing `POST /v1/embeddings` with
/// bearer-token auth. Errors are never retried.
pub struct HttpEmbedding {
    http: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
    dimensions: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingRow>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingRow {
    embedding: Vec<f32>,
    #[serde(default)]
    index: Option<usize>,
}

impl HttpEmbedding {
    /// Client for `base_url` (no trailing `/v1`).
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key: api_key.into(),
            dimensions: None,
        }
    }

    /// Requests a specific output size. Chainable builder method.
    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = Some(dimensions);
        self
    }

    /// Builds the client from an `http` provider config.
    pub fn from_config(config: &ProviderConfig) -> QuiverResult<Self> {
        match config {
            ProviderConfig::Http {
                model,
                api_key,
                dimensions,
                ..
            } => {
                let api_key = api_key
                    .as_deref()
                    .filter(|k| !k.is_empty())
                    .ok_or_else(|| {
                        QuiverError::Config("http embedding provider requires an api_key".into())
                    })?;
                let base_url = config.base_url().unwrap_or("https://api.openai.com");
                let mut provider = Self::new(base_url, model.clone(), api_key);
                provider.dimensions = *dimensions;
                Ok(provider)
            }
            ProviderConfig::Local { .. } => Err(QuiverError::Config(
                "expected an http provider config".into(),
            )),
        }
    }

    async fn request(&self, input: &[&str]) -> QuiverResult<Vec<Vec<f32>>> {
        let url = format!("{}/v1/embeddings", self.base_url);
        let mut body = serde_json::json!({
            "model": self.model,
            "input": input,
        });
        if let Some(dim) = self.dimensions {
            body["dimensions"] = serde_json::json!(dim);
        }

        debug!(count = input.len(), model = %self.model, "Requesting embeddings");
        let resp = self
            .http
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| QuiverError::Provider(e.to_string()))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| QuiverError::Provider(e.to_string()))?;

        if !status.is_success() {
            return Err(QuiverError::Provider(format!(
                "Embedding API error {status}: {text}"
            )));
        }

        let parsed: EmbeddingResponse = serde_json::from_str(&text)
            .map_err(|e| QuiverError::Provider(format!("Malformed embedding response: {e}")))?;
        order_rows(parsed.data, input.len())
    }
}

/// Puts rows back in request order and checks the count.
fn order_rows(mut rows: Vec<EmbeddingRow>, expected: usize) -> QuiverResult<Vec<Vec<f32>>> {
    if rows.len() != expected {
        return Err(QuiverError::Provider(format!(
            "Embedding response has {} rows for {expected} inputs",
            rows.len()
        )));
    }
    if rows.iter().all(|r| r.index.is_some()) {
        rows.sort_by_key(|r| r.index);
    }
    Ok(rows.into_iter().map(|r| r.embedding).collect())
}

#[async_trait]
impl EmbeddingProvider for HttpEmbedding {
    async fn embed(&self, text: &str) -> QuiverResult<Vec<f32>> {
        let mut rows = self.request(&[text]).await?;
        rows.pop()
            .ok_or_else(|| QuiverError::Provider("Empty embedding response".into()))
    }

    async fn embed_batch(&self, texts: &[&str]) -> QuiverResult<Option<Vec<Vec<f32>>>> {
        if texts.is_empty() {
            return Ok(Some(Vec::new()));
        }
        self.request(texts).await.map(Some)
    }
}
