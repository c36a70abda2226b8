//! Price samples and pip conventions.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// A single quote for one instrument. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSample {
    /// Instrument identifier (e.g. `EUR_USD`)
    pub instrument: String,
    /// Best bid price
    pub bid: f64,
    /// Best ask price
    pub ask: f64,
    /// Mid price
    pub mid: f64,
    /// Quote timestamp
    pub timestamp: DateTime<Utc>,
    /// Traded volume, when the feed provides it
    pub volume: Option<f64>,
}

impl PriceSample {
    /// Create a sample from bid/ask; the mid price is derived.
    pub fn new(instrument: impl Into<String>, bid: f64, ask: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            instrument: instrument.into(),
            bid,
            ask,
            mid: (bid + ask) / 2.0,
            timestamp,
            volume: None,
        }
    }

    /// Create a sample where only a single traded/mid price is known.
    pub fn from_mid(instrument: impl Into<String>, mid: f64, timestamp: DateTime<Utc>) -> Self {
        Self::new(instrument, mid, mid, timestamp)
    }

    /// Attach a volume figure.
    pub fn with_volume(mut self, volume: f64) -> Self {
        self.volume = Some(volume);
        self
    }

    /// Get the spread.
    #[inline]
    pub fn spread(&self) -> f64 {
        self.ask - self.bid
    }

    /// Get the spread expressed in pips of this instrument.
    pub fn spread_pips(&self) -> f64 {
        self.spread() / pip_size_f64(&self.instrument)
    }

    /// Finite, strictly positive prices with a non-negative spread.
    pub fn is_valid(&self) -> bool {
        self.bid.is_finite()
            && self.ask.is_finite()
            && self.bid > 0.0
            && self.ask > 0.0
            && self.ask >= self.bid
    }
}

/// Pip size of an instrument: 0.01 for JPY-quoted pairs, 0.0001 otherwise.
pub fn pip_size(instrument: &str) -> Decimal {
    let normalized: String = instrument
        .chars()
        .filter(|c| c.is_ascii_alphabetic())
        .collect::<String>()
        .to_ascii_uppercase();

    if normalized.ends_with("JPY") {
        dec!(0.01)
    } else {
        dec!(0.0001)
    }
}

/// Pip size as `f64` for indicator-side arithmetic.
pub fn pip_size_f64(instrument: &str) -> f64 {
    if pip_size(instrument) == dec!(0.01) {
        0.01
    } else {
        0.0001
    }
}

/// Convert a price difference into pips of the given instrument.
pub fn to_pips(price_delta: Decimal, instrument: &str) -> Decimal {
    price_delta / pip_size(instrument)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mid_and_spread() {
        let sample = PriceSample::new("EUR_USD", 1.1000, 1.1002, Utc::now());

        assert!((sample.mid - 1.1001).abs() < 1e-9);
        assert!((sample.spread_pips() - 2.0).abs() < 1e-6);
        assert!(sample.is_valid());
    }

    #[test]
    fn test_invalid_samples() {
        let now = Utc::now();
        assert!(!PriceSample::new("EUR_USD", f64::NAN, 1.1, now).is_valid());
        assert!(!PriceSample::new("EUR_USD", 0.0, 0.0, now).is_valid());
        assert!(!PriceSample::new("EUR_USD", 1.2, 1.1, now).is_valid());
    }

    #[test]
    fn test_pip_sizes() {
        assert_eq!(pip_size("EUR_USD"), dec!(0.0001));
        assert_eq!(pip_size("USD_JPY"), dec!(0.01));
        assert_eq!(pip_size("gbpjpy"), dec!(0.01));
        assert_eq!(to_pips(dec!(0.0025), "EUR_USD"), dec!(25));
        assert_eq!(to_pips(dec!(-0.5), "USD_JPY"), dec!(-50));
    }
}
