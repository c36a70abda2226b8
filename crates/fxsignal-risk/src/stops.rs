//! Stop-loss and take-profit distance specs.

use fxsignal_core::{pip_size, Side};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// How a stop-loss or take-profit distance is derived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum StopSpec {
    /// Fixed number of pips from entry
    Pips { pips: Decimal },
    /// Multiple of the instrument's current ATR
    Atr { multiplier: Decimal },
}

impl StopSpec {
    /// Price distance from entry, before profile adjustments.
    ///
    /// `None` for an ATR-based stop without a positive ATR.
    pub fn distance(&self, instrument: &str, atr: Option<Decimal>) -> Option<Decimal> {
        let distance = match self {
            StopSpec::Pips { pips } => *pips * pip_size(instrument),
            StopSpec::Atr { multiplier } => *multiplier * atr.filter(|a| *a > Decimal::ZERO)?,
        };
        (distance > Decimal::ZERO).then_some(distance)
    }

    /// Whether the distance parameters are usable.
    pub fn is_valid(&self) -> bool {
        match self {
            StopSpec::Pips { pips } => *pips > Decimal::ZERO,
            StopSpec::Atr { multiplier } => *multiplier > Decimal::ZERO,
        }
    }
}

/// Stop-loss price for an entry: below for a Buy, above for a Sell.
pub fn stop_price(entry: Decimal, side: Side, distance: Decimal) -> Decimal {
    entry - side.sign() * distance
}

/// Take-profit price for an entry: above for a Buy, below for a Sell.
pub fn target_price(entry: Decimal, side: Side, distance: Decimal) -> Decimal {
    entry + side.sign() * distance
}
