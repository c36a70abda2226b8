//! ADX momentum strategy.

use crate::rules::{apply_sentiment, momentum_rule, MomentumParams};
use fxsignal_core::{
    error::StrategyError,
    traits::{EvaluationContext, Strategy, StrategyConfig},
    types::{CandidateSignal, RationaleTag},
};
use serde::{Deserialize, Serialize};

/// Configuration for the ADX momentum strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdxMomentumConfig {
    /// Instruments to trade
    pub instruments: Vec<String>,
    /// ADX approximation period
    pub adx_period: usize,
    /// Momentum lookback
    pub momentum_period: usize,
    /// Minimum ADX for a signal
    pub min_adx: f64,
    /// Minimum absolute momentum for a signal
    pub min_momentum: f64,
    /// Sentiment influence on confidence
    pub sentiment_weight: f64,
}

impl Default for AdxMomentumConfig {
    fn default() -> Self {
        Self {
            instruments: vec![],
            adx_period: 14,
            momentum_period: 10,
            min_adx: 20.0,
            min_momentum: 0.0005,
            sentiment_weight: 0.2,
        }
    }
}

impl StrategyConfig for AdxMomentumConfig {
    fn validate(&self) -> Result<(), StrategyError> {
        if self.adx_period < 2 {
            return Err(StrategyError::InvalidConfig(
                "ADX period must be at least 2".into(),
            ));
        }
        if self.momentum_period == 0 {
            return Err(StrategyError::InvalidConfig(
                "Momentum period must be greater than 0".into(),
            ));
        }
        if !(0.0..=100.0).contains(&self.min_adx) {
            return Err(StrategyError::InvalidConfig(
                "min_adx must be within [0, 100]".into(),
            ));
        }
        if self.min_momentum < 0.0 {
            return Err(StrategyError::InvalidConfig(
                "min_momentum must not be negative".into(),
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

/// Momentum strategy filtered by trend strength.
pub struct AdxMomentumStrategy {
    id: String,
    config: AdxMomentumConfig,
}

impl AdxMomentumStrategy {
    pub fn new(id: impl Into<String>, config: AdxMomentumConfig) -> Self {
        Self {
            id: id.into(),
            config,
        }
    }

    fn params(&self) -> MomentumParams {
        MomentumParams {
            adx_period: self.config.adx_period,
            momentum_period: self.config.momentum_period,
            min_adx: self.config.min_adx,
            min_momentum: self.config.min_momentum,
        }
    }
}

impl Strategy for AdxMomentumStrategy {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> &str {
        "adx_momentum"
    }

    fn description(&self) -> &str {
        "Follows momentum when the ADX approximation shows a trending market"
    }

    fn evaluate(&self, ctx: &EvaluationContext<'_>) -> Vec<CandidateSignal> {
        let Some(reading) = momentum_rule(ctx.prices, &self.params()) else {
            return vec![];
        };

        // ADX carries the conviction, strength the rest
        let confidence = apply_sentiment(
            (0.4 + 0.6 * reading.adx / 100.0).min(1.0),
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
            RationaleTag::MomentumAdx,
            ctx.latest.mid,
            ctx.now,
        )
        .with_indicator("adx", reading.adx)
        .with_indicator("momentum", reading.momentum)]
    }

    fn warmup_period(&self) -> usize {
        self.config.adx_period.max(self.config.momentum_period + 1)
    }

    fn instruments(&self) -> &[String] {
        &self.config.instruments
    }
}
