//! Indicator trait definitions.

use crate::error::IndicatorError;

/// Trait for technical indicators over a bounded price history.
///
/// Indicators are pure functions of the history slice (oldest first). When
/// the slice is too short they return their documented fallback value
/// instead of failing.
pub trait Indicator: Send + Sync {
    /// Compute the latest indicator value.
    fn value(&self, prices: &[f64]) -> f64;

    /// Minimum samples needed for a non-fallback value.
    fn required_history(&self) -> usize;

    /// Get the name of the indicator.
    fn name(&self) -> &str;

    /// Check whether `prices` is long enough for a non-fallback value.
    fn validate_history(&self, prices: &[f64]) -> Result<(), IndicatorError> {
        if prices.len() < self.required_history() {
            return Err(IndicatorError::InsufficientHistory {
                required: self.required_history(),
                available: prices.len(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct LastDelta;

    impl Indicator for LastDelta {
        fn value(&self, prices: &[f64]) -> f64 {
            match prices {
                [.., prev, last] => last - prev,
                _ => 0.0,
            }
        }

        fn required_history(&self) -> usize {
            2
        }

        fn name(&self) -> &str {
            "last_delta"
        }
    }

    #[test]
    fn test_indicator_validation() {
        let indicator = LastDelta;

        assert!(indicator.validate_history(&[1.0]).is_err());
        assert!(indicator.validate_history(&[1.0, 2.0]).is_ok());
        assert_eq!(indicator.value(&[1.0]), 0.0);
        assert!((indicator.value(&[1.0, 1.5]) - 0.5).abs() < 1e-12);
    }
}
