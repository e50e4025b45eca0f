use quiver_core::{EngineConfig, QuiverError, QuiverResult, SearchResult, SearchStrategy};
use std::fmt;
use std::sync::Arc;

/// Post-hoc predicate over scored results.
pub type ResultFilter = Arc<dyn Fn(&SearchResult) -> bool + Send + Sync>;

/// Options for [`SearchEngine::search_with`](crate::SearchEngine::search_with).
#[derive(Clone)]
pub struct SearchOptions {
    /// Ranking strategy.
    pub strategy: SearchStrategy,
    /// Maximum number of results.
    pub limit: usize,
    /// Softmax temperature (softmax strategy only). Must be > 0.
    pub temperature: f32,
    /// Relevance/diversity balance (MMR strategy only), clamped to `[0, 1]`.
    pub mmr_lambda: f32,
    /// Applied to the full candidate list before truncation to `limit`.
    pub filter: Option<ResultFilter>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

impl fmt::Debug for SearchOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchOptions")
            .field("strategy", &self.strategy)
            .field("limit", &self.limit)
            .field("temperature", &self.temperature)
            .field("mmr_lambda", &self.mmr_lambda)
            .field("filter", &self.filter.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

impl SearchOptions {
    /// Cosine strategy with the engine-wide defaults from `config`.
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            strategy: SearchStrategy::Cosine,
            limit: config.default_limit,
            temperature: config.default_temperature,
            mmr_lambda: config.default_mmr_lambda,
            filter: None,
        }
    }

    /// Sets the strategy. Chainable builder method.
    pub fn with_strategy(mut self, strategy: SearchStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Sets the result limit. Chainable builder method.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Sets the softmax temperature. Chainable builder method.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Sets the MMR lambda. Chainable builder method.
    pub fn with_mmr_lambda(mut self, lambda: f32) -> Self {
        self.mmr_lambda = lambda;
        self
    }

    /// Sets the result predicate. Chainable builder method.
    pub fn with_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&SearchResult) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Arc::new(filter));
        self
    }

    pub(crate) fn validate(&self) -> QuiverResult<()> {
        validate_temperature(self.temperature)?;
        if self.mmr_lambda.is_nan() {
            return Err(QuiverError::InvalidInput(
                "mmr_lambda must be a number".to_string(),
            ));
        }
        Ok(())
    }

    pub(crate) fn accepts(&self, result: &SearchResult) -> bool {
        self.filter.as_ref().map_or(true, |f| f(result))
    }
}

pub(crate) fn validate_temperature(temperature: f32) -> QuiverResult<()> {
    if temperature.is_finite() && temperature > 0.0 {
        Ok(())
    } else {
        Err(QuiverError::InvalidInput(format!(
            "temperature must be > 0, got {temperature}"
        )))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let opts = SearchOptions::default();
        assert_eq!(opts.strategy, SearchStrategy::Cosine);
        assert_eq!(opts.limit, 5);
        assert!((opts.temperature - 1.0).abs() < f32::EPSILON);
        assert!((opts.mmr_lambda - 0.5).abs() < f32::EPSILON);
        assert!(opts.filter.is_none());
    }

    #[test]
    fn test_builder_and_filter() {
        let opts = SearchOptions::default()
            .with_strategy(SearchStrategy::Mmr)
            .with_limit(8)
            .with_mmr_lambda(0.7)
            .with_filter(|r| r.score > 0.5);
        assert_eq!(opts.limit, 8);
        let hit = SearchResult {
            id: "a".into(),
            text: "t".into(),
            score: 0.9,
            meta: None,
        };
        assert!(opts.accepts(&hit));
        assert!(!opts.accepts(&SearchResult { score: 0.1, ..hit }));
        assert!(format!("{opts:?}").contains("<fn>"));
    }

    #[test]
    fn test_validate() {
        assert!(SearchOptions::default().validate().is_ok());
        assert!(SearchOptions::default().with_temperature(0.0).validate().is_err());
        assert!(SearchOptions::default()
            .with_temperature(f32::INFINITY)
            .validate()
            .is_err());
        assert!(SearchOptions::default()
            .with_mmr_lambda(f32::NAN)
            .validate()
            .is_err());
    }
}
