//! Order routing types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Trade direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Get the opposite side.
    pub fn opposite(&self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }

    /// Get the sign for pip calculations (+1 for buy, -1 for sell).
    pub fn sign(&self) -> Decimal {
        match self {
            Side::Buy => Decimal::ONE,
            Side::Sell => -Decimal::ONE,
        }
    }

    /// Same as [`Side::sign`] for floating-point indicator math.
    pub fn sign_f64(&self) -> f64 {
        match self {
            Side::Buy => 1.0,
            Side::Sell => -1.0,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

/// A sized order handed to the order gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderTicket {
    /// Client-side identifier, equal to the lifecycle trade id
    pub client_id: String,
    /// Account the order is booked against
    pub account: String,
    /// Instrument to trade
    pub instrument: String,
    /// Buy or sell
    pub side: Side,
    /// Units to trade (always positive)
    pub units: Decimal,
    /// Price the signal was generated at
    pub planned_price: Decimal,
    /// Protective stop price
    pub stop_loss: Decimal,
    /// Profit target price
    pub take_profit: Decimal,
}

/// Successful submission reported by the gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    /// Broker-side trade identifier
    pub trade_id: String,
    /// Executed price
    pub fill_price: Decimal,
    /// Execution time
    pub filled_at: DateTime<Utc>,
}

/// Emergency de-risking directive: close a fraction of the losing positions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReductionRequest {
    /// Account to de-risk
    pub account: String,
    /// Fraction of losing exposure to close, in (0, 1]
    pub fraction: Decimal,
    /// Margin usage that triggered the request
    pub margin_usage: Decimal,
    /// When the governor issued the request
    pub issued_at: DateTime<Utc>,
}

/// A position the broker closed on its own (stop, target or reduction).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionClosed {
    /// Client id of the order that opened the position
    pub client_id: String,
    /// Account the position was booked against
    pub account: String,
    /// Instrument
    pub instrument: String,
    /// Price the position was closed at
    pub exit_price: Decimal,
    /// Close time
    pub closed_at: DateTime<Utc>,
    /// Why the broker closed it (e.g. `stop_loss`)
    pub reason: String,
}
