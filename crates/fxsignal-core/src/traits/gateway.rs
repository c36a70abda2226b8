//! Order gateway trait.

use crate::error::GatewayError;
use crate::types::{AccountSnapshot, OrderTicket, PositionClosed, ReductionRequest, Submission};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// Broker-facing order routing.
///
/// The pipeline never executes trades itself; everything that touches the
/// market goes through this trait with an explicit timeout around it.
#[async_trait]
pub trait OrderGateway: Send + Sync {
    /// Submit a sized order.
    ///
    /// # Returns
    /// The broker trade id and fill price, or [`GatewayError::Rejected`].
    async fn submit(&self, ticket: &OrderTicket) -> Result<Submission, GatewayError>;

    /// Ask the broker to close a fraction of the account's losing positions.
    async fn request_reduction(&self, request: &ReductionRequest) -> Result<(), GatewayError>;

    /// Get balance and margin figures for an account.
    async fn account_snapshot(&self, account: &str) -> Result<AccountSnapshot, GatewayError>;

    /// Report a market price to the broker.
    ///
    /// # Returns
    /// Positions the broker closed since the last call, including those
    /// closed by a reduction request. Brokers that push closes through
    /// another channel keep the default, which reports nothing.
    async fn mark_price(
        &self,
        _instrument: &str,
        _price: Decimal,
        _at: DateTime<Utc>,
    ) -> Result<Vec<PositionClosed>, GatewayError> {
        Ok(Vec::new())
    }

    /// Get the gateway name.
    fn name(&self) -> &str;
}
