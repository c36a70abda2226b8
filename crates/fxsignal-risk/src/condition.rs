//! Market condition detection for one account-instrument pair.

use fxsignal_core::{error::ConditionError, MarketCondition};
use fxsignal_indicators::momentum;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Detection thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionThresholds {
    /// Relative price move that counts as elevated volatility
    pub elevated: f64,
    /// Relative price move that counts as high volatility
    pub high: f64,
    /// Minimum |momentum| on both horizons for a reversal
    pub reversal_min_momentum: f64,
    /// Lookback for the price delta and the long momentum
    pub long_window: usize,
    /// Lookback for the short momentum
    pub short_window: usize,
    /// Margin usage that raises severity to elevated
    pub margin_warning: Decimal,
    /// Margin usage that means risk-off and forces a reduction
    pub margin_critical: Decimal,
}

impl Default for DetectionThresholds {
    fn default() -> Self {
        Self {
            elevated: 0.003,
            high: 0.006,
            reversal_min_momentum: 0.0005,
            long_window: 20,
            short_window: 5,
            margin_warning: dec!(0.7),
            margin_critical: dec!(0.9),
        }
    }
}

/// Everything the detector looks at for one pair.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionInputs {
    pub account: String,
    pub instrument: String,
    /// Absolute relative price move over the long window
    pub price_delta: f64,
    pub short_momentum: f64,
    pub long_momentum: f64,
    /// News oracle flagged a central-bank event for the instrument
    pub central_bank: bool,
    /// Account margin used / balance
    pub margin_usage: Option<Decimal>,
}

impl ConditionInputs {
    /// Derive the price inputs from a mid-price history.
    pub fn from_prices(
        account: impl Into<String>,
        instrument: impl Into<String>,
        prices: &[f64],
        thresholds: &DetectionThresholds,
    ) -> Self {
        let long_momentum = momentum(prices, thresholds.long_window);
        Self {
            account: account.into(),
            instrument: instrument.into(),
            price_delta: long_momentum.abs(),
            short_momentum: momentum(prices, thresholds.short_window),
            long_momentum,
            central_bank: false,
            margin_usage: None,
        }
    }

    /// Inputs for an account with no tracked instruments: margin only.
    pub fn margin_only(account: impl Into<String>, margin_usage: Option<Decimal>) -> Self {
        Self {
            account: account.into(),
            instrument: "*".to_string(),
            price_delta: 0.0,
            short_momentum: 0.0,
            long_momentum: 0.0,
            central_bank: false,
            margin_usage,
        }
    }

    pub fn with_central_bank(mut self, flagged: bool) -> Self {
        self.central_bank = flagged;
        self
    }

    pub fn with_margin_usage(mut self, margin_usage: Option<Decimal>) -> Self {
        self.margin_usage = margin_usage;
        self
    }

    fn check(&self) -> Result<(), ConditionError> {
        for (field, value) in [
            ("price_delta", self.price_delta),
            ("short_momentum", self.short_momentum),
            ("long_momentum", self.long_momentum),
        ] {
            if !value.is_finite() {
                return Err(ConditionError::NonFinite {
                    account: self.account.clone(),
                    instrument: self.instrument.clone(),
                    field,
                });
            }
        }
        if self.price_delta < 0.0 {
            return Err(self.negative("price_delta", self.price_delta.to_string()));
        }
        if let Some(margin) = self.margin_usage {
            if margin < Decimal::ZERO {
                return Err(self.negative("margin_usage", margin.to_string()));
            }
        }
        Ok(())
    }

    fn negative(&self, field: &'static str, value: String) -> ConditionError {
        ConditionError::Negative {
            account: self.account.clone(),
            instrument: self.instrument.clone(),
            field,
            value,
        }
    }
}

/// Classifies a pair into a [`MarketCondition`].
#[derive(Debug, Clone, Default)]
pub struct ConditionDetector {
    thresholds: DetectionThresholds,
}

impl ConditionDetector {
    pub fn new(thresholds: DetectionThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &DetectionThresholds {
        &self.thresholds
    }

    /// Most severe condition any detector raises, starting from `Normal`.
    pub fn detect(&self, inputs: &ConditionInputs) -> Result<MarketCondition, ConditionError> {
        inputs.check()?;
        let t = &self.thresholds;
        let mut condition = MarketCondition::Normal;

        if inputs.price_delta >= t.high {
            condition = condition.escalate(MarketCondition::HighVolatility);
        } else if inputs.price_delta >= t.elevated {
            condition = condition.escalate(MarketCondition::ElevatedVolatility);
        }

        let reversed = inputs.short_momentum * inputs.long_momentum < 0.0
            && inputs.short_momentum.abs() >= t.reversal_min_momentum
            && inputs.long_momentum.abs() >= t.reversal_min_momentum;
        if reversed {
            condition = condition.escalate(MarketCondition::MomentumReversal);
        }

        if inputs.central_bank {
            condition = condition.escalate(MarketCondition::CentralBankEvent);
        }

        if let Some(margin) = inputs.margin_usage {
            if margin >= t.margin_critical {
                condition = condition.escalate(MarketCondition::RiskOff);
            } else if margin >= t.margin_warning {
                condition = condition.escalate(MarketCondition::ElevatedVolatility);
            }
        }

        Ok(condition)
    }

    /// Like [`detect`](Self::detect), but unexpected input falls back to
    /// `Normal` with a warning.
    pub fn classify(&self, inputs: &ConditionInputs) -> MarketCondition {
        match self.detect(inputs) {
            Ok(condition) => condition,
            Err(e) => {
                warn!(
                    account = %inputs.account,
                    instrument = %inputs.instrument,
                    error = %e,
                    "Condition detection failed, assuming normal"
                );
                MarketCondition::Normal
            }
        }
    }

    /// Whether `margin_usage` is at or above the critical level.
    pub fn is_critical(&self, margin_usage: Decimal) -> bool {
        margin_usage >= self.thresholds.margin_critical
    }
}
