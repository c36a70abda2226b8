//! Condition -> risk profile adaptation.
//!
//! Every adaptation starts from the account's base profile, so repeated
//! re-adaptation never compounds.

use fxsignal_core::{MarketCondition, RiskProfile, TradeFrequency};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Adjustments applied for one condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdaptationRule {
    /// Factor on the base position size multiplier
    pub position_size_factor: Decimal,
    /// Factor on the base stop-loss distance
    pub stop_loss_factor: Decimal,
    /// Factor on the base take-profit distance
    pub take_profit_factor: Decimal,
    /// Cap on margin usage; the lower of this and the base value applies
    pub max_margin_usage: Option<Decimal>,
    /// Cap on open positions
    pub max_positions: Option<u32>,
    /// Stop opening new trades
    pub pause: bool,
}

impl Default for AdaptationRule {
    fn default() -> Self {
        Self {
            position_size_factor: Decimal::ONE,
            stop_loss_factor: Decimal::ONE,
            take_profit_factor: Decimal::ONE,
            max_margin_usage: None,
            max_positions: None,
            pause: false,
        }
    }
}

impl AdaptationRule {
    fn sized(factor: Decimal) -> Self {
        Self {
            position_size_factor: factor,
            ..Default::default()
        }
    }
}

/// Condition -> adjustment table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AdaptationTable {
    rules: BTreeMap<MarketCondition, AdaptationRule>,
}

impl Default for AdaptationTable {
    fn default() -> Self {
        let mut rules = BTreeMap::new();
        rules.insert(MarketCondition::Normal, AdaptationRule::default());
        rules.insert(
            MarketCondition::ElevatedVolatility,
            AdaptationRule {
                stop_loss_factor: dec!(1.2),
                ..AdaptationRule::sized(dec!(0.75))
            },
        );
        rules.insert(
            MarketCondition::HighVolatility,
            AdaptationRule {
                stop_loss_factor: dec!(1.5),
                take_profit_factor: dec!(1.2),
                max_margin_usage: Some(dec!(0.3)),
                ..AdaptationRule::sized(dec!(0.5))
            },
        );
        rules.insert(
            MarketCondition::CentralBankEvent,
            AdaptationRule {
                stop_loss_factor: dec!(1.5),
                max_margin_usage: Some(dec!(0.25)),
                pause: true,
                ..AdaptationRule::sized(dec!(0.5))
            },
        );
        rules.insert(
            MarketCondition::MomentumReversal,
            AdaptationRule {
                stop_loss_factor: dec!(0.8),
                take_profit_factor: dec!(0.8),
                ..AdaptationRule::sized(dec!(0.6))
            },
        );
        rules.insert(
            MarketCondition::RiskOff,
            AdaptationRule {
                max_margin_usage: Some(dec!(0.2)),
                max_positions: Some(1),
                pause: true,
                ..AdaptationRule::sized(dec!(0.25))
            },
        );
        Self { rules }
    }
}

impl AdaptationTable {
    /// Start from the defaults and replace the given entries.
    pub fn with_overrides(overrides: BTreeMap<MarketCondition, AdaptationRule>) -> Self {
        let mut table = Self::default();
        table.rules.extend(overrides);
        table
    }

    /// Rule for `condition`; conditions without an entry leave the profile unchanged.
    pub fn rule(&self, condition: MarketCondition) -> AdaptationRule {
        self.rules.get(&condition).cloned().unwrap_or_default()
    }

    /// Adapt `base` for `condition`.
    pub fn apply(&self, base: &RiskProfile, condition: MarketCondition) -> RiskProfile {
        apply_rule(base, &self.rule(condition))
    }
}

/// Account-specific extra adjustment for one condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountOverride {
    pub condition: MarketCondition,
    #[serde(flatten)]
    pub rule: AdaptationRule,
}

/// Apply a rule on top of a profile.
pub fn apply_rule(profile: &RiskProfile, rule: &AdaptationRule) -> RiskProfile {
    let max_margin_usage = match rule.max_margin_usage {
        Some(cap) => profile.max_margin_usage.min(cap),
        None => profile.max_margin_usage,
    };
    let max_positions = match rule.max_positions {
        Some(cap) => profile.max_positions.min(cap),
        None => profile.max_positions,
    };
    let trade_frequency = if rule.pause {
        TradeFrequency::Paused
    } else {
        profile.trade_frequency
    };

    RiskProfile {
        position_size_multiplier: profile.position_size_multiplier * rule.position_size_factor,
        stop_loss_adjustment: profile.stop_loss_adjustment * rule.stop_loss_factor,
        take_profit_adjustment: profile.take_profit_adjustment * rule.take_profit_factor,
        max_positions,
        max_margin_usage,
        trade_frequency,
    }
}

/// Table adaptation followed by any account override for the same condition.
pub fn adapt(
    table: &AdaptationTable,
    base: &RiskProfile,
    overrides: &[AccountOverride],
    condition: MarketCondition,
) -> RiskProfile {
    overrides
        .iter()
        .filter(|o| o.condition == condition)
        .fold(table.apply(base, condition), |profile, o| {
            apply_rule(&profile, &o.rule)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table() {
        let table = AdaptationTable::default();
        let base = RiskProfile::default();

        assert_eq!(table.apply(&base, MarketCondition::Normal), base);

        let high = table.apply(&base, MarketCondition::HighVolatility);
        assert_eq!(high.position_size_multiplier, dec!(0.5));
        assert_eq!(high.max_margin_usage, dec!(0.3));
        assert!(!high.is_paused());

        let event = table.apply(&base, MarketCondition::CentralBankEvent);
        assert!(event.is_paused());
        assert_eq!(event.max_margin_usage, dec!(0.25));

        let risk_off = table.apply(&base, MarketCondition::RiskOff);
        assert_eq!(risk_off.position_size_multiplier, dec!(0.25));
        assert_eq!(risk_off.max_positions, 1);
        assert!(risk_off.is_paused());
    }

    #[test]
    fn test_adaptation_never_compounds() {
        let table = AdaptationTable::default();
        let base = RiskProfile {
            position_size_multiplier: dec!(2),
            ..Default::default()
        };

        let once = table.apply(&base, MarketCondition::ElevatedVolatility);
        let twice = table.apply(&base, MarketCondition::ElevatedVolatility);
        assert_eq!(once, twice);
        assert_eq!(once.position_size_multiplier, dec!(1.5));
    }

    #[test]
    fn test_margin_cap_keeps_lower_base() {
        let table = AdaptationTable::default();
        let base = RiskProfile {
            max_margin_usage: dec!(0.1),
            ..Default::default()
        };
        let high = table.apply(&base, MarketCondition::HighVolatility);
        assert_eq!(high.max_margin_usage, dec!(0.1));
    }

    #[test]
    fn test_account_override() {
        let table = AdaptationTable::default();
        let base = RiskProfile::default();
        let conservative = vec![AccountOverride {
            condition: MarketCondition::HighVolatility,
            rule: AdaptationRule {
                position_size_factor: dec!(0.5),
                ..Default::default()
            },
        }];

        let high = adapt(&table, &base, &conservative, MarketCondition::HighVolatility);
        assert_eq!(high.position_size_multiplier, dec!(0.25));

        let elevated = adapt(&table, &base, &conservative, MarketCondition::ElevatedVolatility);
        assert_eq!(elevated.position_size_multiplier, dec!(0.75));
    }

    #[test]
    fn test_table_overrides_from_json() {
        let overrides: BTreeMap<MarketCondition, AdaptationRule> = serde_json::from_value(
            serde_json::json!({ "elevated_volatility": { "position_size_factor": "0.9" } }),
        )
        .unwrap();
        let table = AdaptationTable::with_overrides(overrides);

        let elevated = table.rule(MarketCondition::ElevatedVolatility);
        assert_eq!(elevated.position_size_factor, dec!(0.9));
        assert_eq!(elevated.stop_loss_factor, Decimal::ONE);
        assert_eq!(table.rule(MarketCondition::RiskOff).position_size_factor, dec!(0.25));
    }
}
