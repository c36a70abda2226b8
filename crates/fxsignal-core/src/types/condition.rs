//! Market conditions ordered by severity.

use serde::{Deserialize, Serialize};

/// Market/account condition. The discriminant is the severity rank, so the
/// derived ordering is the severity order and two distinct conditions never tie.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MarketCondition {
    #[default]
    Normal = 0,
    ElevatedVolatility = 1,
    HighVolatility = 2,
    CentralBankEvent = 3,
    MomentumReversal = 4,
    RiskOff = 5,
}

impl MarketCondition {
    /// All conditions in ascending severity.
    pub const ALL: [MarketCondition; 6] = [
        MarketCondition::Normal,
        MarketCondition::ElevatedVolatility,
        MarketCondition::HighVolatility,
        MarketCondition::CentralBankEvent,
        MarketCondition::MomentumReversal,
        MarketCondition::RiskOff,
    ];

    /// Severity rank.
    pub fn severity(&self) -> u8 {
        *self as u8
    }

    /// The most severe condition of a set, `Normal` when empty.
    pub fn most_severe<I>(conditions: I) -> MarketCondition
    where
        I: IntoIterator<Item = MarketCondition>,
    {
        conditions.into_iter().max().unwrap_or_default()
    }

    /// Raise to `other` if it is more severe.
    pub fn escalate(self, other: MarketCondition) -> MarketCondition {
        self.max(other)
    }
}

impl std::fmt::Display for MarketCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            MarketCondition::Normal => "normal",
            MarketCondition::ElevatedVolatility => "elevated_volatility",
            MarketCondition::HighVolatility => "high_volatility",
            MarketCondition::CentralBankEvent => "central_bank_event",
            MarketCondition::MomentumReversal => "momentum_reversal",
            MarketCondition::RiskOff => "risk_off",
        };
        f.write_str(name)
    }
}
