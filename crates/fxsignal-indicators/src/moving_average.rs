//! Moving average indicators.

use crate::simd;
use fxsignal_core::traits::Indicator;

/// Exponential moving average of `prices`.
///
/// The recurrence is seeded with the oldest sample and runs over the whole
/// slice with `alpha = 2 / (period + 1)`. With fewer than `period` samples
/// the last raw price is returned (0 for an empty slice).
pub fn ema(prices: &[f64], period: usize) -> f64 {
    let Some(&last) = prices.last() else {
        return 0.0;
    };
    if period == 0 || prices.len() < period {
        return last;
    }

    let alpha = 2.0 / (period as f64 + 1.0);
    let one_minus_alpha = 1.0 - alpha;

    prices[1..]
        .iter()
        .fold(prices[0], |acc, &price| alpha * price + one_minus_alpha * acc)
}

/// Mean of the trailing `period` prices.
///
/// Falls back to the mean of everything available when the slice is shorter.
pub fn sma(prices: &[f64], period: usize) -> f64 {
    let start = prices.len().saturating_sub(period.max(1));
    simd::mean(&prices[start..])
}

/// Exponential Moving Average (EMA).
#[derive(Debug, Clone)]
pub struct Ema {
    period: usize,
}

impl Ema {
    /// Create a new EMA with the specified period.
    pub fn new(period: usize) -> Self {
        assert!(period > 0, "Period must be greater than 0");
        Self { period }
    }

    pub fn period(&self) -> usize {
        self.period
    }
}

impl Indicator for Ema {
    fn value(&self, prices: &[f64]) -> f64 {
        ema(prices, self.period)
    }

    fn required_history(&self) -> usize {
        self.period
    }

    fn name(&self) -> &str {
        "EMA"
    }
}

/// Simple Moving Average (SMA) over a trailing window.
#[derive(Debug, Clone)]
pub struct Sma {
    period: usize,
}

impl Sma {
    /// Create a new SMA with the specified period.
    pub fn new(period: usize) -> Self {
        assert!(period > 0, "Period must be greater than 0");
        Self { period }
    }
}

impl Indicator for Sma {
    fn value(&self, prices: &[f64]) -> f64 {
        sma(prices, self.period)
    }

    fn required_history(&self) -> usize {
        self.period
    }

    fn name(&self) -> &str {
        "SMA"
    }
}
