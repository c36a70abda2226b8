//! Session breakout strategy.
//!
//! Fires when price leaves the recent range by a relative threshold, and
//! only in the direction the EMA stack agrees with.

use crate::rules::{apply_sentiment, breakout_rule, trend_rule, TrendParams};
use fxsignal_core::{
    error::StrategyError,
    traits::{EvaluationContext, Strategy, StrategyConfig},
    types::{CandidateSignal, RationaleTag},
};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Configuration for the session breakout strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionBreakoutConfig {
    /// Instruments to trade
    pub instruments: Vec<String>,
    /// Trailing window for the range mean
    pub lookback: usize,
    /// Relative distance from the mean that counts as a breakout
    pub breakout_threshold: f64,
    /// Require the EMA stack to agree with the breakout direction
    pub require_trend_agreement: bool,
    pub fast_period: usize,
    pub mid_period: usize,
    pub slow_period: usize,
    /// Confidence at the threshold distance
    pub base_confidence: f64,
    /// Sentiment influence on confidence
    pub sentiment_weight: f64,
}

impl Default for SessionBreakoutConfig {
    fn default() -> Self {
        Self {
            instruments: vec![],
            lookback: 20,
            breakout_threshold: 0.001,
            require_trend_agreement: true,
            fast_period: 3,
            mid_period: 8,
            slow_period: 21,
            base_confidence: 0.55,
            sentiment_weight: 0.2,
        }
    }
}

impl StrategyConfig for SessionBreakoutConfig {
    fn validate(&self) -> Result<(), StrategyError> {
        if self.lookback < 2 {
            return Err(StrategyError::InvalidConfig(
                "Lookback must be at least 2".into(),
            ));
        }
        if self.breakout_threshold <= 0.0 {
            return Err(StrategyError::InvalidConfig(
                "breakout_threshold must be positive".into(),
            ));
        }
        if self.fast_period == 0
            || !(self.fast_period < self.mid_period && self.mid_period < self.slow_period)
        {
            return Err(StrategyError::InvalidConfig(
                "EMA periods must satisfy 0 < fast < mid < slow".into(),
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

/// Session breakout strategy.
pub struct SessionBreakoutStrategy {
    id: String,
    config: SessionBreakoutConfig,
}

impl SessionBreakoutStrategy {
    pub fn new(id: impl Into<String>, config: SessionBreakoutConfig) -> Self {
        Self {
            id: id.into(),
            config,
        }
    }
}

impl Strategy for SessionBreakoutStrategy {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> &str {
        "session_breakout"
    }

    fn description(&self) -> &str {
        "Trades range breakouts confirmed by the EMA stack"
    }

    fn evaluate(&self, ctx: &EvaluationContext<'_>) -> Vec<CandidateSignal> {
        if !self.is_warmed_up(ctx.prices.len()) {
            return vec![];
        }

        let Some(breakout) =
            breakout_rule(ctx.prices, self.config.lookback, self.config.breakout_threshold)
        else {
            return vec![];
        };

        let trend = trend_rule(
            ctx.prices,
            &TrendParams {
                fast: self.config.fast_period,
                mid: self.config.mid_period,
                slow: self.config.slow_period,
                ..Default::default()
            },
        );
        let agrees = trend.map(|t| t.side == breakout.side).unwrap_or(false);
        if self.config.require_trend_agreement && !agrees {
            debug!(
                strategy = %self.id,
                instrument = ctx.instrument,
                side = %breakout.side,
                "Breakout without trend agreement"
            );
            return vec![];
        }

        // strength saturates at three times the threshold distance
        let strength =
            (breakout.distance.abs() / (3.0 * self.config.breakout_threshold)).clamp(0.0, 1.0);
        let base = self.config.base_confidence;
        let confidence = apply_sentiment(
            base + (1.0 - base) * strength,
            ctx.sentiment,
            self.config.sentiment_weight,
            breakout.side,
        );

        vec![CandidateSignal::new(
            ctx.instrument,
            breakout.side,
            confidence,
            strength,
            &self.id,
            RationaleTag::Breakout,
            ctx.latest.mid,
            ctx.now,
        )
        .with_indicator("range_mean", breakout.mean)
        .with_indicator("breakout_distance", breakout.distance)]
    }

    fn warmup_period(&self) -> usize {
        (self.config.lookback + 1).max(self.config.slow_period)
    }

    fn instruments(&self) -> &[String] {
        &self.config.instruments
    }
}
