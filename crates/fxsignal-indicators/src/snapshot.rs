//! Latest indicator values for one instrument.

use crate::{adx_approx, atr, ema, momentum, volatility};
use serde::{Deserialize, Serialize};

/// Lookback periods used to build an [`IndicatorSnapshot`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorPeriods {
    pub ema_fast: usize,
    pub ema_mid: usize,
    pub ema_slow: usize,
    pub atr: usize,
    pub adx: usize,
    pub momentum: usize,
    pub volatility: usize,
}

impl Default for IndicatorPeriods {
    fn default() -> Self {
        Self {
            ema_fast: 3,
            ema_mid: 8,
            ema_slow: 21,
            atr: 14,
            adx: 14,
            momentum: 10,
            volatility: 20,
        }
    }
}

impl IndicatorPeriods {
    /// Longest lookback among the periods.
    pub fn max_lookback(&self) -> usize {
        [
            self.ema_fast,
            self.ema_mid,
            self.ema_slow,
            self.atr + 1,
            self.adx,
            self.momentum + 1,
            self.volatility,
        ]
        .into_iter()
        .max()
        .unwrap_or(0)
    }
}

/// Bundle of the latest indicator values.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    pub last_price: f64,
    pub ema_fast: f64,
    pub ema_mid: f64,
    pub ema_slow: f64,
    pub atr: f64,
    pub adx: f64,
    pub momentum: f64,
    pub volatility: f64,
    pub samples: usize,
}

impl IndicatorSnapshot {
    /// Compute every indicator over `prices` (oldest first).
    pub fn compute(prices: &[f64], periods: &IndicatorPeriods) -> Self {
        Self {
            last_price: prices.last().copied().unwrap_or(0.0),
            ema_fast: ema(prices, periods.ema_fast),
            ema_mid: ema(prices, periods.ema_mid),
            ema_slow: ema(prices, periods.ema_slow),
            atr: atr(prices, periods.atr),
            adx: adx_approx(prices, periods.adx),
            momentum: momentum(prices, periods.momentum),
            volatility: volatility(prices, periods.volatility),
            samples: prices.len(),
        }
    }

    /// Whether every lookback is satisfied.
    pub fn is_complete(&self, periods: &IndicatorPeriods) -> bool {
        self.samples >= periods.max_lookback()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_on_rising_series() {
        let prices: Vec<f64> = (0..30).map(|i| 1.1 + i as f64 * 0.001).collect();
        let periods = IndicatorPeriods::default();
        let snap = IndicatorSnapshot::compute(&prices, &periods);

        assert!(snap.ema_fast > snap.ema_mid && snap.ema_mid > snap.ema_slow);
        assert!((snap.atr - 0.001).abs() < 1e-9);
        assert!(snap.momentum > 0.0);
        assert!(snap.adx > 0.0);
        assert!(snap.is_complete(&periods));
    }

    #[test]
    fn test_compute_on_empty_history() {
        let snap = IndicatorSnapshot::compute(&[], &IndicatorPeriods::default());
        assert_eq!(snap, IndicatorSnapshot::default());
        assert!(!snap.is_complete(&IndicatorPeriods::default()));
    }

    #[test]
    fn test_max_lookback() {
        assert_eq!(IndicatorPeriods::default().max_lookback(), 21);
    }
}
