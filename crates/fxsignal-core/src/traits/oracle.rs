//! News/event oracle trait.

use crate::error::DataError;
use async_trait::async_trait;

/// Optional news/event source.
///
/// Callers treat errors and timeouts as the permissive answer: no pause and
/// neutral sentiment.
#[async_trait]
pub trait NewsOracle: Send + Sync {
    /// Whether trading in any of `instruments` should pause for an event.
    async fn should_pause(&self, instruments: &[String]) -> Result<bool, DataError>;

    /// Aggregate sentiment for `instruments` in [-1, 1].
    async fn sentiment(&self, instruments: &[String]) -> Result<f64, DataError>;

    /// Get the oracle name.
    fn name(&self) -> &str;
}

/// Oracle used when no news source is configured. Never pauses, always neutral.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopOracle;

#[async_trait]
impl NewsOracle for NoopOracle {
    async fn should_pause(&self, _instruments: &[String]) -> Result<bool, DataError> {
        Ok(false)
    }

    async fn sentiment(&self, _instruments: &[String]) -> Result<f64, DataError> {
        Ok(0.0)
    }

    fn name(&self) -> &str {
        "noop"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_noop_oracle_is_permissive() {
        let oracle = NoopOracle;
        let instruments = vec!["EUR_USD".to_string()];

        assert!(!oracle.should_pause(&instruments).await.unwrap());
        assert_eq!(oracle.sentiment(&instruments).await.unwrap(), 0.0);
    }
}
