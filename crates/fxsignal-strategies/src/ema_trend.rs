//! EMA trend strategy.
//!
//! Goes with the trend when the fast, mid and slow EMAs are stacked in
//! order. Confidence rises with the fast/slow spread.

use crate::rules::{apply_sentiment, trend_rule, TrendParams};
use fxsignal_core::{
    error::StrategyError,
    traits::{EvaluationContext, Strategy, StrategyConfig},
    types::{CandidateSignal, RationaleTag},
};
use serde::{Deserialize, Serialize};

/// Configuration for the EMA trend strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmaTrendConfig {
    /// Instruments to trade
    pub instruments: Vec<String>,
    /// Fast EMA period
    pub fast_period: usize,
    /// Mid EMA period
    pub mid_period: usize,
    /// Slow EMA period
    pub slow_period: usize,
    /// Relative fast/slow spread treated as full strength
    pub full_strength_spread: f64,
    /// Confidence at zero strength
    pub base_confidence: f64,
    /// Sentiment influence on confidence
    pub sentiment_weight: f64,
}

impl Default for EmaTrendConfig {
    fn default() -> Self {
        Self {
            instruments: vec![],
            fast_period: 3,
            mid_period: 8,
            slow_period: 21,
            full_strength_spread: 0.002,
            base_confidence: 0.5,
            sentiment_weight: 0.2,
        }
    }
}

impl EmaTrendConfig {
    fn trend_params(&self) -> TrendParams {
        TrendParams {
            fast: self.fast_period,
            mid: self.mid_period,
            slow: self.slow_period,
            full_strength_spread: self.full_strength_spread,
        }
    }
}

impl StrategyConfig for EmaTrendConfig {
    fn validate(&self) -> Result<(), StrategyError> {
        if self.fast_period == 0 {
            return Err(StrategyError::InvalidConfig(
                "Fast period must be greater than 0".into(),
            ));
        }
        if !(self.fast_period < self.mid_period && self.mid_period < self.slow_period) {
            return Err(StrategyError::InvalidConfig(
                "EMA periods must satisfy fast < mid < slow".into(),
            ));
        }
        if self.full_strength_spread <= 0.0 {
            return Err(StrategyError::InvalidConfig(
                "full_strength_spread must be positive".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.base_confidence) {
            return Err(StrategyError::InvalidConfig(
                "base_confidence must be within [0, 1]".into(),
            ));
        }
        if self.instruments.is_empty() {
            return Err(StrategyError::InvalidConfig(
                "At least one instrument required".into(),
            ));
        }
        Ok(())
    }
}

/// EMA trend strategy.
pub struct EmaTrendStrategy {
    id: String,
    config: EmaTrendConfig,
}

impl EmaTrendStrategy {
    pub fn new(id: impl Into<String>, config: EmaTrendConfig) -> Self {
        Self {
            id: id.into(),
            config,
        }
    }

    pub fn config(&self) -> &EmaTrendConfig {
        &self.config
    }
}

impl Strategy for EmaTrendStrategy {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> &str {
        "ema_trend"
    }

    fn description(&self) -> &str {
        "Trades in the direction of stacked fast/mid/slow EMAs"
    }

    fn evaluate(&self, ctx: &EvaluationContext<'_>) -> Vec<CandidateSignal> {
        let Some(reading) = trend_rule(ctx.prices, &self.config.trend_params()) else {
            return vec![];
        };

        let base = self.config.base_confidence;
        let confidence = apply_sentiment(
            base + (1.0 - base) * reading.strength,
            ctx.sentiment,
            self.config.sentiment_weight,
            reading.side,
        );

        vec![CandidateSignal::new(
            ctx.instrument,
            reading.side,
            confidence,
            reading.strength,
            &self.id,
            RationaleTag::EmaAlignment,
            ctx.latest.mid,
            ctx.now,
        )
        .with_indicator("ema_fast", reading.fast)
        .with_indicator("ema_mid", reading.mid)
        .with_indicator("ema_slow", reading.slow)]
    }

    fn warmup_period(&self) -> usize {
        self.config.slow_period
    }

    fn instruments(&self) -> &[String] {
        &self.config.instruments
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use fxsignal_core::types::{PriceSample, Side};

    fn strategy() -> EmaTrendStrategy {
        EmaTrendStrategy::new(
            "trend_eu",
            EmaTrendConfig {
                instruments: vec!["EUR_USD".to_string()],
                ..Default::default()
            },
        )
    }

    fn evaluate(strategy: &EmaTrendStrategy, prices: &[f64], sentiment: f64) -> Vec<CandidateSignal> {
        let now = Utc.with_ymd_and_hms(2024, 3, 4, 13, 0, 0).unwrap();
        let latest = PriceSample::from_mid("EUR_USD", *prices.last().unwrap(), now);
        strategy.evaluate(&EvaluationContext {
            instrument: "EUR_USD",
            prices,
            latest: &latest,
            sentiment,
            now,
        })
    }

    #[test]
    fn test_config_validation() {
        let mut config = EmaTrendConfig {
            instruments: vec!["EUR_USD".to_string()],
            ..Default::default()
        };
        assert!(config.validate().is_ok());

        config.mid_period = 30;
        assert!(config.validate().is_err());

        config.mid_period = 8;
        config.instruments.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rising_series_emits_buy() {
        let prices: Vec<f64> = (0..21).map(|i| 1.1000 + i as f64 * 0.0002).collect();
        let signals = evaluate(&strategy(), &prices, 0.0);

        assert_eq!(signals.len(), 1);
        let signal = &signals[0];
        assert_eq!(signal.side, Side::Buy);
        assert!(signal.strength > 0.0);
        assert!(signal.confidence >= 0.5 && signal.confidence <= 1.0);
        assert_eq!(signal.rationale, RationaleTag::EmaAlignment);
        assert_eq!(signal.strategy_id, "trend_eu");
        assert!(signal.indicators.contains_key("ema_slow"));
    }

    #[test]
    fn test_short_history_emits_nothing() {
        let prices: Vec<f64> = (0..10).map(|i| 1.1 + i as f64 * 0.001).collect();
        assert!(evaluate(&strategy(), &prices, 0.0).is_empty());
    }

    #[test]
    fn test_sentiment_shifts_confidence() {
        let prices: Vec<f64> = (0..25).map(|i| 1.1000 + i as f64 * 0.00001).collect();
        let neutral = evaluate(&strategy(), &prices, 0.0)[0].confidence;
        let bullish = evaluate(&strategy(), &prices, 1.0)[0].confidence;
        let bearish = evaluate(&strategy(), &prices, -1.0)[0].confidence;

        assert!(bullish > neutral);
        assert!(bearish < neutral);
    }
}
