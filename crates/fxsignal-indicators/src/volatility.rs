//! Volatility indicators.

use crate::simd;
use fxsignal_core::traits::Indicator;

/// Average range from consecutive closes.
///
/// Mean absolute difference between consecutive prices over the trailing
/// `period` differences. With fewer differences than `period`, the mean of
/// all available differences; 0 with fewer than two prices.
pub fn atr(prices: &[f64], period: usize) -> f64 {
    let diffs = simd::abs_diffs(prices);
    if diffs.is_empty() {
        return 0.0;
    }

    let start = diffs.len().saturating_sub(period.max(1));
    simd::mean(&diffs[start..])
}

/// Population standard deviation of the trailing `window` prices.
pub fn stdev(prices: &[f64], window: usize) -> f64 {
    if window < 2 || prices.len() < window {
        return 0.0;
    }
    simd::std_dev(&prices[prices.len() - window..])
}

/// Coefficient of variation (`stdev / mean`) over the trailing `window`.
///
/// Returns 0 when the history is shorter than the window or the mean is 0.
pub fn volatility(prices: &[f64], window: usize) -> f64 {
    if window < 2 || prices.len() < window {
        return 0.0;
    }

    let tail = &prices[prices.len() - window..];
    let mean = simd::mean(tail);
    if mean == 0.0 {
        return 0.0;
    }

    simd::variance_about(tail, mean).sqrt() / mean
}

/// Average True Range approximated from a single price stream.
#[derive(Debug, Clone)]
pub struct Atr {
    period: usize,
}

impl Atr {
    /// Create a new ATR indicator. Common period is 14.
    pub fn new(period: usize) -> Self {
        assert!(period > 0, "Period must be greater than 0");
        Self { period }
    }
}

impl Indicator for Atr {
    fn value(&self, prices: &[f64]) -> f64 {
        atr(prices, self.period)
    }

    fn required_history(&self) -> usize {
        self.period + 1
    }

    fn name(&self) -> &str {
        "ATR"
    }
}

/// Relative volatility (coefficient of variation).
#[derive(Debug, Clone)]
pub struct Volatility {
    window: usize,
}

impl Volatility {
    pub fn new(window: usize) -> Self {
        assert!(window > 1, "Window must be greater than 1");
        Self { window }
    }
}

impl Indicator for Volatility {
    fn value(&self, prices: &[f64]) -> f64 {
        volatility(prices, self.window)
    }

    fn required_history(&self) -> usize {
        self.window
    }

    fn name(&self) -> &str {
        "Volatility"
    }
}
