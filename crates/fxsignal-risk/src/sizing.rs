//! Order sizing from balance, stop distance and the adapted risk profile.

use crate::stops::{stop_price, target_price, StopSpec};
use fxsignal_core::{RiskProfile, Side};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Sizing parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SizingConfig {
    /// Percentage of balance risked per trade
    pub risk_per_trade_pct: Decimal,
    /// Upper bound on units per order
    pub max_units: Decimal,
    /// Orders below this many units are not placed
    pub min_units: Decimal,
}

impl Default for SizingConfig {
    fn default() -> Self {
        Self {
            risk_per_trade_pct: dec!(1),
            max_units: dec!(100000),
            min_units: dec!(1),
        }
    }
}

/// Sized order parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SizedOrder {
    pub units: Decimal,
    pub stop_loss: Decimal,
    pub take_profit: Decimal,
    pub stop_distance: Decimal,
}

/// Converts an approved signal into units and protective prices.
#[derive(Debug, Clone, Default)]
pub struct OrderSizer {
    config: SizingConfig,
}

impl OrderSizer {
    pub fn new(config: SizingConfig) -> Self {
        Self { config }
    }

    /// Size an order.
    ///
    /// Units are `balance * risk_pct / stop_distance * multiplier`, floored
    /// and capped at `max_units`. Stop and target distances are scaled by
    /// the profile's adjustments.
    ///
    /// # Returns
    /// `None` if a distance cannot be derived or the size rounds below
    /// `min_units`.
    #[allow(clippy::too_many_arguments)]
    pub fn size(
        &self,
        instrument: &str,
        side: Side,
        entry: Decimal,
        balance: Decimal,
        profile: &RiskProfile,
        stop_loss: &StopSpec,
        take_profit: &StopSpec,
        atr: Option<Decimal>,
    ) -> Option<SizedOrder> {
        if entry <= Decimal::ZERO || balance <= Decimal::ZERO {
            return None;
        }

        let stop_distance = stop_loss.distance(instrument, atr)? * profile.stop_loss_adjustment;
        let target_distance =
            take_profit.distance(instrument, atr)? * profile.take_profit_adjustment;
        if stop_distance <= Decimal::ZERO || target_distance <= Decimal::ZERO {
            return None;
        }

        let risk_amount = balance * (self.config.risk_per_trade_pct / dec!(100));
        let units = (risk_amount / stop_distance * profile.position_size_multiplier)
            .floor()
            .min(self.config.max_units);
        if units < self.config.min_units {
            return None;
        }

        Some(SizedOrder {
            units,
            stop_loss: stop_price(entry, side, stop_distance),
            take_profit: target_price(entry, side, target_distance),
            stop_distance,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pips(n: Decimal) -> StopSpec {
        StopSpec::Pips { pips: n }
    }

    #[test]
    fn test_risk_based_units() {
        let sizer = OrderSizer::default();
        let profile = RiskProfile::default();

        // 1% of 10_000 = 100 at risk over 20 pips (0.0020) = 50_000 units
        let order = sizer
            .size(
                "EUR_USD",
                Side::Buy,
                dec!(1.1000),
                dec!(10000),
                &profile,
                &pips(dec!(20)),
                &pips(dec!(40)),
                None,
            )
            .unwrap();

        assert_eq!(order.units, dec!(50000));
        assert_eq!(order.stop_loss, dec!(1.0980));
        assert_eq!(order.take_profit, dec!(1.1040));
    }

    #[test]
    fn test_profile_scales_size_and_stops() {
        let sizer = OrderSizer::default();
        let profile = RiskProfile {
            position_size_multiplier: dec!(0.5),
            stop_loss_adjustment: dec!(2),
            ..Default::default()
        };

        let order = sizer
            .size(
                "EUR_USD",
                Side::Sell,
                dec!(1.1000),
                dec!(10000),
                &profile,
                &pips(dec!(20)),
                &pips(dec!(40)),
                None,
            )
            .unwrap();

        // stop 40 pips -> 25_000 units, halved
        assert_eq!(order.units, dec!(12500));
        assert_eq!(order.stop_loss, dec!(1.1040));
        assert_eq!(order.take_profit, dec!(1.0960));
    }

    #[test]
    fn test_max_and_min_units() {
        let sizer = OrderSizer::new(SizingConfig {
            max_units: dec!(10000),
            min_units: dec!(1000),
            ..Default::default()
        });
        let profile = RiskProfile::default();

        let capped = sizer
            .size(
                "EUR_USD",
                Side::Buy,
                dec!(1.1),
                dec!(10000),
                &profile,
                &pips(dec!(20)),
                &pips(dec!(20)),
                None,
            )
            .unwrap();
        assert_eq!(capped.units, dec!(10000));

        let tiny = sizer.size(
            "EUR_USD",
            Side::Buy,
            dec!(1.1),
            dec!(10),
            &profile,
            &pips(dec!(20)),
            &pips(dec!(20)),
            None,
        );
        assert!(tiny.is_none());
    }

    #[test]
    fn test_atr_spec_without_atr() {
        let sizer = OrderSizer::default();
        let atr_spec = StopSpec::Atr { multiplier: dec!(2) };
        let result = sizer.size(
            "EUR_USD",
            Side::Buy,
            dec!(1.1),
            dec!(10000),
            &RiskProfile::default(),
            &atr_spec,
            &pips(dec!(20)),
            None,
        );
        assert!(result.is_none());

        let with_atr = sizer
            .size(
                "EUR_USD",
                Side::Buy,
                dec!(1.1),
                dec!(10000),
                &RiskProfile::default(),
                &atr_spec,
                &pips(dec!(20)),
                Some(dec!(0.0005)),
            )
            .unwrap();
        assert_eq!(with_atr.stop_distance, dec!(0.0010));
        assert_eq!(with_atr.units, dec!(100000));
    }
}
