//! Canonical rule shapes shared by the built-in strategies.
//!
//! Each rule returns `None` ("no signal") when the history is shorter than
//! its minimum requirement.

use fxsignal_core::Side;
use fxsignal_indicators::{adx_approx, ema, momentum, sma};

/// Output of the EMA-ordering rule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendReading {
    pub side: Side,
    /// Normalized fast/slow spread in [0, 1]
    pub strength: f64,
    pub fast: f64,
    pub mid: f64,
    pub slow: f64,
}

/// EMA periods and strength scale for the trend rule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendParams {
    pub fast: usize,
    pub mid: usize,
    pub slow: usize,
    /// Relative fast/slow spread that maps to strength 1.0
    pub full_strength_spread: f64,
}

impl Default for TrendParams {
    fn default() -> Self {
        Self {
            fast: 3,
            mid: 8,
            slow: 21,
            full_strength_spread: 0.002,
        }
    }
}

/// Trend rule: fast > mid > slow is a Buy, fast < mid < slow a Sell.
pub fn trend_rule(prices: &[f64], params: &TrendParams) -> Option<TrendReading> {
    let required = params.fast.max(params.mid).max(params.slow);
    if prices.len() < required {
        return None;
    }

    let fast = ema(prices, params.fast);
    let mid = ema(prices, params.mid);
    let slow = ema(prices, params.slow);

    let side = if fast > mid && mid > slow {
        Side::Buy
    } else if fast < mid && mid < slow {
        Side::Sell
    } else {
        return None;
    };

    let strength = if slow > 0.0 && params.full_strength_spread > 0.0 {
        ((fast - slow).abs() / slow / params.full_strength_spread).clamp(0.0, 1.0)
    } else {
        0.0
    };

    Some(TrendReading {
        side,
        strength,
        fast,
        mid,
        slow,
    })
}

/// Output of the breakout rule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BreakoutReading {
    pub side: Side,
    /// Mean of the lookback window preceding the latest price
    pub mean: f64,
    /// `(price - mean) / mean`
    pub distance: f64,
}

/// Breakout rule: latest price at least `threshold` (relative) away from the
/// mean of the preceding `lookback` prices.
pub fn breakout_rule(prices: &[f64], lookback: usize, threshold: f64) -> Option<BreakoutReading> {
    if lookback == 0 || prices.len() < lookback + 1 {
        return None;
    }

    let (window, latest) = prices.split_at(prices.len() - 1);
    let price = latest[0];
    let mean = sma(window, lookback);
    if mean <= 0.0 {
        return None;
    }

    if (price - mean).abs() < mean * threshold {
        return None;
    }

    let side = if price > mean { Side::Buy } else { Side::Sell };
    Some(BreakoutReading {
        side,
        mean,
        distance: (price - mean) / mean,
    })
}

/// Output of the momentum/ADX rule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MomentumReading {
    pub side: Side,
    pub adx: f64,
    pub momentum: f64,
    /// Bounded combination of ADX and momentum in [0, 1]
    pub strength: f64,
}

/// Thresholds for the momentum/ADX rule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MomentumParams {
    pub adx_period: usize,
    pub momentum_period: usize,
    pub min_adx: f64,
    pub min_momentum: f64,
}

impl Default for MomentumParams {
    fn default() -> Self {
        Self {
            adx_period: 14,
            momentum_period: 10,
            min_adx: 20.0,
            min_momentum: 0.0005,
        }
    }
}

/// Momentum/ADX rule: `adx >= min_adx` and `|momentum| >= min_momentum`.
///
/// Strength averages `adx / 100` with the momentum's multiple of its floor
/// (saturating at twice the floor).
pub fn momentum_rule(prices: &[f64], params: &MomentumParams) -> Option<MomentumReading> {
    let required = params.adx_period.max(params.momentum_period + 1);
    if prices.len() < required {
        return None;
    }

    let adx = adx_approx(prices, params.adx_period);
    let mom = momentum(prices, params.momentum_period);
    if adx < params.min_adx || mom.abs() < params.min_momentum || mom == 0.0 {
        return None;
    }

    let momentum_score = if params.min_momentum > 0.0 {
        (mom.abs() / (2.0 * params.min_momentum)).min(1.0)
    } else {
        1.0
    };
    let strength = (0.5 * adx / 100.0 + 0.5 * momentum_score).clamp(0.0, 1.0);
    let side = if mom > 0.0 { Side::Buy } else { Side::Sell };

    Some(MomentumReading {
        side,
        adx,
        momentum: mom,
        strength,
    })
}

/// Scale a confidence by news sentiment.
///
/// `confidence * (1 + weight * sentiment * side_sign)` with the sentiment
/// clamped to [-1, 1] and the result clamped to [0, 1].
pub fn apply_sentiment(confidence: f64, sentiment: f64, weight: f64, side: Side) -> f64 {
    let sentiment = if sentiment.is_finite() {
        sentiment.clamp(-1.0, 1.0)
    } else {
        0.0
    };
    let scaled = confidence * (1.0 + weight * sentiment * side.sign_f64());
    if scaled.is_finite() {
        scaled.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rising(n: usize) -> Vec<f64> {
        (0..n).map(|i| 1.1000 + i as f64 * 0.0005).collect()
    }

    fn falling(n: usize) -> Vec<f64> {
        (0..n).map(|i| 1.1000 - i as f64 * 0.0005).collect()
    }

    #[test]
    fn test_trend_rule_rising_series_is_buy() {
        let reading = trend_rule(&rising(21), &TrendParams::default()).unwrap();

        assert_eq!(reading.side, Side::Buy);
        assert!(reading.strength > 0.0);
        assert!(reading.strength <= 1.0);
    }

    #[test]
    fn test_trend_rule_falling_series_is_sell() {
        let reading = trend_rule(&falling(30), &TrendParams::default()).unwrap();
        assert_eq!(reading.side, Side::Sell);
    }

    #[test]
    fn test_trend_rule_short_or_flat() {
        assert!(trend_rule(&rising(20), &TrendParams::default()).is_none());
        assert!(trend_rule(&[1.1; 40], &TrendParams::default()).is_none());
    }

    #[test]
    fn test_breakout_rule() {
        let mut prices = vec![1.1000; 20];
        prices.push(1.1030);
        let reading = breakout_rule(&prices, 20, 0.001).unwrap();
        assert_eq!(reading.side, Side::Buy);
        assert!((reading.mean - 1.1).abs() < 1e-12);

        prices.push(1.0970);
        let reading = breakout_rule(&prices, 20, 0.001).unwrap();
        assert_eq!(reading.side, Side::Sell);
        assert!(reading.distance < 0.0);
    }

    #[test]
    fn test_breakout_rule_below_threshold_or_short() {
        let mut prices = vec![1.1000; 20];
        prices.push(1.1005);
        assert!(breakout_rule(&prices, 20, 0.001).is_none());
        assert!(breakout_rule(&prices[..10], 20, 0.001).is_none());
    }

    #[test]
    fn test_momentum_rule() {
        let reading = momentum_rule(&rising(30), &MomentumParams::default()).unwrap();
        assert_eq!(reading.side, Side::Buy);
        assert!(reading.adx >= 20.0);
        assert!(reading.strength > 0.0 && reading.strength <= 1.0);

        let reading = momentum_rule(&falling(30), &MomentumParams::default()).unwrap();
        assert_eq!(reading.side, Side::Sell);
        assert!(reading.momentum < 0.0);
    }

    #[test]
    fn test_momentum_rule_thresholds() {
        let strict = MomentumParams {
            min_adx: 90.0,
            ..Default::default()
        };
        assert!(momentum_rule(&rising(30), &strict).is_none());
        assert!(momentum_rule(&[1.1; 30], &MomentumParams::default()).is_none());
        assert!(momentum_rule(&rising(5), &MomentumParams::default()).is_none());
    }

    #[test]
    fn test_apply_sentiment() {
        assert!((apply_sentiment(0.5, 1.0, 0.2, Side::Buy) - 0.6).abs() < 1e-12);
        assert!((apply_sentiment(0.5, 1.0, 0.2, Side::Sell) - 0.4).abs() < 1e-12);
        assert_eq!(apply_sentiment(0.9, 5.0, 1.0, Side::Buy), 1.0);
        assert_eq!(apply_sentiment(0.9, -1.0, 2.0, Side::Buy), 0.0);
        assert_eq!(apply_sentiment(0.7, f64::NAN, 0.2, Side::Buy), 0.7);
    }
}
