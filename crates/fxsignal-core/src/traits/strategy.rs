//! Strategy trait definitions.

use crate::error::StrategyError;
use crate::types::{CandidateSignal, PriceSample};
use chrono::{DateTime, Utc};

/// Configuration trait for strategies.
pub trait StrategyConfig: Send + Sync + Clone + 'static {
    /// Validate the configuration.
    fn validate(&self) -> Result<(), StrategyError>;
}

/// Everything a rule set may look at for one instrument in one cycle.
///
/// `prices` is the mid-price history from the cycle snapshot, oldest first.
#[derive(Debug, Clone, Copy)]
pub struct EvaluationContext<'a> {
    /// Instrument under evaluation
    pub instrument: &'a str,
    /// Mid prices, oldest first
    pub prices: &'a [f64],
    /// Most recent sample
    pub latest: &'a PriceSample,
    /// News sentiment in [-1, 1], 0 when no oracle is available
    pub sentiment: f64,
    /// Evaluation time
    pub now: DateTime<Utc>,
}

/// Core strategy trait.
///
/// A strategy is a fixed rule set over indicator values. Evaluation is pure:
/// per-day bookkeeping lives with the quality gate, not in the strategy.
pub trait Strategy: Send + Sync {
    /// Configured identifier, unique within a deployment.
    fn id(&self) -> &str;

    /// Registry name of the rule set (e.g. `ema_trend`).
    fn kind(&self) -> &str;

    /// Evaluate the rule set for one instrument.
    ///
    /// # Returns
    /// Zero or more candidates. Too little history yields an empty vector,
    /// never an error.
    fn evaluate(&self, ctx: &EvaluationContext<'_>) -> Vec<CandidateSignal>;

    /// Number of samples needed before any rule can fire.
    fn warmup_period(&self) -> usize;

    /// Instruments this strategy trades.
    fn instruments(&self) -> &[String];

    /// Check if enough history is available.
    fn is_warmed_up(&self, samples_available: usize) -> bool {
        samples_available >= self.warmup_period()
    }

    /// Get a description of the strategy.
    fn description(&self) -> &str {
        ""
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{RationaleTag, Side};

    struct LastTickStrategy {
        instruments: Vec<String>,
    }

    impl Strategy for LastTickStrategy {
        fn id(&self) -> &str {
            "last_tick"
        }

        fn kind(&self) -> &str {
            "test"
        }

        fn evaluate(&self, ctx: &EvaluationContext<'_>) -> Vec<CandidateSignal> {
            if !self.is_warmed_up(ctx.prices.len()) {
                return vec![];
            }
            let n = ctx.prices.len();
            if ctx.prices[n - 1] > ctx.prices[n - 2] {
                vec![CandidateSignal::new(
                    ctx.instrument,
                    Side::Buy,
                    0.5,
                    0.5,
                    self.id(),
                    RationaleTag::MomentumAdx,
                    ctx.latest.mid,
                    ctx.now,
                )]
            } else {
                vec![]
            }
        }

        fn warmup_period(&self) -> usize {
            2
        }

        fn instruments(&self) -> &[String] {
            &self.instruments
        }
    }

    #[test]
    fn test_strategy_warmup() {
        let strategy = LastTickStrategy {
            instruments: vec!["EUR_USD".to_string()],
        };
        let now = Utc::now();
        let latest = PriceSample::from_mid("EUR_USD", 1.2, now);

        let short = [1.2];
        let ctx = EvaluationContext {
            instrument: "EUR_USD",
            prices: &short,
            latest: &latest,
            sentiment: 0.0,
            now,
        };
        assert!(strategy.evaluate(&ctx).is_empty());

        let rising = [1.1, 1.2];
        let ctx = EvaluationContext {
            prices: &rising,
            ..ctx
        };
        assert_eq!(strategy.evaluate(&ctx).len(), 1);
        assert!(strategy.is_warmed_up(2));
        assert!(!strategy.is_warmed_up(1));
    }
}
