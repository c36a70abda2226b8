//! Market data provider trait.

use crate::error::DataError;
use crate::types::PriceSample;
use async_trait::async_trait;

/// Source of live quotes.
///
/// Implementations may block on network I/O; callers wrap every call in a
/// timeout and treat any error as "skip this instrument this cycle".
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Get the latest price for an instrument.
    ///
    /// # Errors
    /// [`DataError::Unavailable`] or [`DataError::Stale`] when the feed cannot
    /// deliver a fresh quote.
    async fn get_price(&self, instrument: &str) -> Result<PriceSample, DataError>;

    /// Get the provider name.
    fn name(&self) -> &str;
}
