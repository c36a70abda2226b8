//! Confirmation predicates and the minimum-quality check.

use fxsignal_core::CandidateSignal;
use fxsignal_indicators::IndicatorSnapshot;
use fxsignal_strategies::rules::{breakout_rule, trend_rule};
use fxsignal_strategies::TrendParams;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A boolean condition that corroborates a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confirmation {
    /// Price broke out of the trailing range in the candidate's direction
    BreakoutDetected,
    /// Relative volatility above the configured floor
    VolatilityAboveFloor,
    /// ATR above the configured floor
    AtrAboveFloor,
    /// Evaluation time falls inside two or more session windows
    SessionOverlap,
    /// The trend rule on a coarser (decimated) history agrees with the side
    MultiTimeframeAlignment,
    /// Momentum sign agrees with the side
    MomentumAligned,
}

impl Confirmation {
    pub const ALL: [Confirmation; 6] = [
        Confirmation::BreakoutDetected,
        Confirmation::VolatilityAboveFloor,
        Confirmation::AtrAboveFloor,
        Confirmation::SessionOverlap,
        Confirmation::MultiTimeframeAlignment,
        Confirmation::MomentumAligned,
    ];
}

impl fmt::Display for Confirmation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Confirmation::BreakoutDetected => "breakout_detected",
            Confirmation::VolatilityAboveFloor => "volatility_above_floor",
            Confirmation::AtrAboveFloor => "atr_above_floor",
            Confirmation::SessionOverlap => "session_overlap",
            Confirmation::MultiTimeframeAlignment => "multi_timeframe_alignment",
            Confirmation::MomentumAligned => "momentum_aligned",
        };
        f.write_str(name)
    }
}

/// Market context the predicates look at.
#[derive(Debug, Clone, Copy)]
pub struct ConfirmationContext<'a> {
    /// Mid prices from the cycle snapshot, oldest first
    pub prices: &'a [f64],
    /// Latest indicator values for the candidate's instrument
    pub indicators: &'a IndicatorSnapshot,
    /// Number of session windows containing the evaluation time
    pub active_windows: usize,
}

/// Floors and lookbacks used by the predicates.
#[derive(Debug, Clone, PartialEq)]
pub struct QualityThresholds {
    pub min_volatility: f64,
    pub min_atr: f64,
    pub breakout_lookback: usize,
    pub breakout_threshold: f64,
    /// Sample stride for the coarse timeframe
    pub decimation: usize,
    pub trend: TrendParams,
}

impl Default for QualityThresholds {
    fn default() -> Self {
        Self {
            min_volatility: 0.0,
            min_atr: 0.0,
            breakout_lookback: 20,
            breakout_threshold: 0.001,
            decimation: 4,
            trend: TrendParams::default(),
        }
    }
}

/// Counts confirmations and enforces `min_confirmations`.
#[derive(Debug, Clone)]
pub struct QualityGate {
    predicates: Vec<Confirmation>,
    min_confirmations: usize,
    thresholds: QualityThresholds,
}

impl QualityGate {
    pub fn new(
        predicates: Vec<Confirmation>,
        min_confirmations: usize,
        thresholds: QualityThresholds,
    ) -> Self {
        let mut unique = Vec::with_capacity(predicates.len());
        for predicate in predicates {
            if !unique.contains(&predicate) {
                unique.push(predicate);
            }
        }
        Self {
            predicates: unique,
            min_confirmations,
            thresholds,
        }
    }

    pub fn predicates(&self) -> &[Confirmation] {
        &self.predicates
    }

    pub fn min_confirmations(&self) -> usize {
        self.min_confirmations
    }

    /// Whether one predicate holds for `candidate`.
    pub fn holds(
        &self,
        predicate: Confirmation,
        candidate: &CandidateSignal,
        ctx: &ConfirmationContext<'_>,
    ) -> bool {
        let t = &self.thresholds;
        match predicate {
            Confirmation::BreakoutDetected => {
                breakout_rule(ctx.prices, t.breakout_lookback, t.breakout_threshold)
                    .is_some_and(|b| b.side == candidate.side)
            }
            Confirmation::VolatilityAboveFloor => ctx.indicators.volatility > t.min_volatility,
            Confirmation::AtrAboveFloor => ctx.indicators.atr > t.min_atr,
            Confirmation::SessionOverlap => ctx.active_windows >= 2,
            Confirmation::MultiTimeframeAlignment => {
                let coarse = decimate(ctx.prices, t.decimation);
                trend_rule(&coarse, &t.trend).is_some_and(|r| r.side == candidate.side)
            }
            Confirmation::MomentumAligned => {
                ctx.indicators.momentum * candidate.side.sign_f64() > 0.0
            }
        }
    }

    /// Number of configured predicates that hold.
    pub fn confirm(&self, candidate: &CandidateSignal, ctx: &ConfirmationContext<'_>) -> usize {
        self.predicates
            .iter()
            .filter(|p| self.holds(**p, candidate, ctx))
            .count()
    }

    /// Whether `candidate` meets the minimum confirmation count.
    pub fn admissible(&self, candidate: &CandidateSignal, ctx: &ConfirmationContext<'_>) -> bool {
        self.confirm(candidate, ctx) >= self.min_confirmations
    }
}

/// Every `stride`-th price counting back from the latest, oldest first.
fn decimate(prices: &[f64], stride: usize) -> Vec<f64> {
    let stride = stride.max(1);
    let mut coarse: Vec<f64> = prices.iter().rev().step_by(stride).copied().collect();
    coarse.reverse();
    coarse
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use fxsignal_core::{RationaleTag, Side};
    use fxsignal_indicators::IndicatorPeriods;

    fn candidate(side: Side) -> CandidateSignal {
        CandidateSignal::new(
            "EUR_USD",
            side,
            0.7,
            0.5,
            "trend",
            RationaleTag::EmaAlignment,
            1.1,
            Utc::now(),
        )
    }

    fn rising(n: usize) -> Vec<f64> {
        (0..n).map(|i| 1.1000 + i as f64 * 0.0002).collect()
    }

    #[test]
    fn test_decimate_keeps_latest() {
        let prices: Vec<f64> = (0..10).map(|i| i as f64).collect();
        assert_eq!(decimate(&prices, 4), vec![1.0, 5.0, 9.0]);
        assert_eq!(decimate(&prices, 0).len(), 10);
    }

    #[test]
    fn test_confirmations_on_trending_market() {
        let prices = rising(120);
        let indicators = IndicatorSnapshot::compute(&prices, &IndicatorPeriods::default());
        let ctx = ConfirmationContext {
            prices: &prices,
            indicators: &indicators,
            active_windows: 1,
        };
        let gate = QualityGate::new(Confirmation::ALL.to_vec(), 3, QualityThresholds::default());
        let buy = candidate(Side::Buy);

        assert!(gate.holds(Confirmation::VolatilityAboveFloor, &buy, &ctx));
        assert!(gate.holds(Confirmation::AtrAboveFloor, &buy, &ctx));
        assert!(gate.holds(Confirmation::MomentumAligned, &buy, &ctx));
        assert!(gate.holds(Confirmation::MultiTimeframeAlignment, &buy, &ctx));
        assert!(!gate.holds(Confirmation::SessionOverlap, &buy, &ctx));
        assert!(gate.admissible(&buy, &ctx));

        let sell = candidate(Side::Sell);
        assert!(!gate.holds(Confirmation::MomentumAligned, &sell, &ctx));
        assert!(!gate.holds(Confirmation::MultiTimeframeAlignment, &sell, &ctx));
    }

    #[test]
    fn test_flat_market_fails_minimum() {
        let prices = vec![1.1; 60];
        let indicators = IndicatorSnapshot::compute(&prices, &IndicatorPeriods::default());
        let ctx = ConfirmationContext {
            prices: &prices,
            indicators: &indicators,
            active_windows: 2,
        };
        let gate = QualityGate::new(Confirmation::ALL.to_vec(), 2, QualityThresholds::default());
        let buy = candidate(Side::Buy);

        // only the session overlap holds
        assert_eq!(gate.confirm(&buy, &ctx), 1);
        assert!(!gate.admissible(&buy, &ctx));
    }

    #[test]
    fn test_subset_of_predicates() {
        let prices = rising(60);
        let indicators = IndicatorSnapshot::compute(&prices, &IndicatorPeriods::default());
        let ctx = ConfirmationContext {
            prices: &prices,
            indicators: &indicators,
            active_windows: 0,
        };
        let gate = QualityGate::new(
            vec![Confirmation::SessionOverlap, Confirmation::MomentumAligned],
            1,
            QualityThresholds::default(),
        );

        assert_eq!(gate.confirm(&candidate(Side::Buy), &ctx), 1);
        assert_eq!(gate.confirm(&candidate(Side::Sell), &ctx), 0);
    }
}
