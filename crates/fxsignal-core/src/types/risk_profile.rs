//! Per-account risk profile.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Whether new trades may be opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TradeFrequency {
    #[default]
    Normal,
    Paused,
}

/// Risk parameters used by order sizing. Mutated only by the risk governor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskProfile {
    /// Multiplier applied to the base position size
    pub position_size_multiplier: Decimal,
    /// Multiplier applied to the stop-loss distance
    pub stop_loss_adjustment: Decimal,
    /// Multiplier applied to the take-profit distance
    pub take_profit_adjustment: Decimal,
    /// Maximum concurrent open positions
    pub max_positions: u32,
    /// Maximum margin usage as a fraction of balance
    pub max_margin_usage: Decimal,
    /// Whether new trades may be opened
    pub trade_frequency: TradeFrequency,
}

impl Default for RiskProfile {
    fn default() -> Self {
        Self {
            position_size_multiplier: Decimal::ONE,
            stop_loss_adjustment: Decimal::ONE,
            take_profit_adjustment: Decimal::ONE,
            max_positions: 5,
            max_margin_usage: dec!(0.5),
            trade_frequency: TradeFrequency::Normal,
        }
    }
}

impl RiskProfile {
    /// Whether new trades are currently paused.
    pub fn is_paused(&self) -> bool {
        self.trade_frequency == TradeFrequency::Paused
    }
}
