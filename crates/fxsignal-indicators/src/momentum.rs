//! Momentum indicators.

use crate::simd;
use fxsignal_core::traits::Indicator;

/// Rate of change over `period` samples.
///
/// `(p[-1] - p[-1-period]) / p[-1-period]`, or 0 when the history is too
/// short or the reference price is 0.
pub fn momentum(prices: &[f64], period: usize) -> f64 {
    if period == 0 || prices.len() < period + 1 {
        return 0.0;
    }

    let last = prices[prices.len() - 1];
    let reference = prices[prices.len() - 1 - period];
    if reference == 0.0 {
        return 0.0;
    }

    (last - reference) / reference
}

/// Trend-strength approximation on a 0..=100 scale.
///
/// Over the trailing `period` prices: mean absolute change divided by the
/// standard deviation of the prices, times 100, capped at 100. Returns 0 for
/// a short history or a flat window.
pub fn adx_approx(prices: &[f64], period: usize) -> f64 {
    if period < 2 || prices.len() < period {
        return 0.0;
    }

    let window = &prices[prices.len() - period..];
    let std = simd::std_dev(window);
    if std == 0.0 || !std.is_finite() {
        return 0.0;
    }

    let mean_change = simd::mean(&simd::abs_diffs(window));
    (mean_change / std * 100.0).min(100.0)
}

/// Momentum (rate of change).
#[derive(Debug, Clone)]
pub struct Momentum {
    period: usize,
}

impl Momentum {
    pub fn new(period: usize) -> Self {
        assert!(period > 0, "Period must be greater than 0");
        Self { period }
    }
}

impl Indicator for Momentum {
    fn value(&self, prices: &[f64]) -> f64 {
        momentum(prices, self.period)
    }

    fn required_history(&self) -> usize {
        self.period + 1
    }

    fn name(&self) -> &str {
        "Momentum"
    }
}

/// ADX approximation.
#[derive(Debug, Clone)]
pub struct AdxApprox {
    period: usize,
}

impl AdxApprox {
    pub fn new(period: usize) -> Self {
        assert!(period > 1, "Period must be greater than 1");
        Self { period }
    }
}

impl Indicator for AdxApprox {
    fn value(&self, prices: &[f64]) -> f64 {
        adx_approx(prices, self.period)
    }

    fn required_history(&self) -> usize {
        self.period
    }

    fn name(&self) -> &str {
        "ADX"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_momentum() {
        let prices = [100.0, 101.0, 102.0, 110.0];
        assert!((momentum(&prices, 3) - 0.10).abs() < 1e-12);
        assert!((momentum(&prices, 1) - (8.0 / 102.0)).abs() < 1e-12);
    }

    #[test]
    fn test_momentum_fallbacks() {
        assert_eq!(momentum(&[1.0, 2.0], 2), 0.0);
        assert_eq!(momentum(&[0.0, 1.0], 1), 0.0);
        assert_eq!(momentum(&[], 5), 0.0);
    }

    #[test]
    fn test_adx_linear_trend() {
        // 14 evenly spaced prices: std = step * sqrt((n^2 - 1) / 12)
        let prices: Vec<f64> = (0..14).map(|i| 1.1 + i as f64 * 0.001).collect();
        let expected = 100.0 / (195.0f64 / 12.0).sqrt();

        assert!((adx_approx(&prices, 14) - expected).abs() < 1e-6);
    }

    #[test]
    fn test_adx_is_capped() {
        // Alternating prices: mean change 2, std 1 -> 200 before the cap
        let prices: Vec<f64> = (0..20).map(|i| if i % 2 == 0 { 1.0 } else { 3.0 }).collect();
        assert_eq!(adx_approx(&prices, 14), 100.0);
    }

    #[test]
    fn test_adx_fallbacks() {
        assert_eq!(adx_approx(&[1.0, 2.0, 3.0], 14), 0.0);
        assert_eq!(adx_approx(&[1.5; 20], 14), 0.0);
    }

    #[test]
    fn test_indicator_trait() {
        let m = Momentum::new(10);
        assert_eq!(m.required_history(), 11);
        assert!(m.validate_history(&[1.0; 10]).is_err());

        let adx = AdxApprox::new(14);
        assert_eq!(adx.name(), "ADX");
        assert_eq!(adx.value(&[1.0; 3]), 0.0);
    }
}
