//! Bounded per-instrument price history.

use fxsignal_core::PriceSample;
use std::collections::VecDeque;

/// Bounded, ordered sequence of samples for one instrument.
///
/// The oldest sample is evicted once `capacity` is reached, so the length
/// never exceeds the capacity.
#[derive(Debug, Clone)]
pub struct RollingHistory {
    instrument: String,
    samples: VecDeque<PriceSample>,
    capacity: usize,
}

impl RollingHistory {
    /// Create an empty history. A zero capacity is treated as 1.
    pub fn new(instrument: impl Into<String>, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            instrument: instrument.into(),
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a sample, evicting the oldest when full.
    ///
    /// # Returns
    /// The evicted sample, if any.
    pub fn push(&mut self, sample: PriceSample) -> Option<PriceSample> {
        let evicted = if self.samples.len() == self.capacity {
            self.samples.pop_front()
        } else {
            None
        };
        self.samples.push_back(sample);
        evicted
    }

    pub fn instrument(&self) -> &str {
        &self.instrument
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Get the most recent sample.
    pub fn last(&self) -> Option<&PriceSample> {
        self.samples.back()
    }

    /// Iterate over samples, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &PriceSample> {
        self.samples.iter()
    }

    /// Mid prices, oldest first.
    pub fn mids(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.mid).collect()
    }

    /// Owned copy of the samples, oldest first.
    pub fn to_vec(&self) -> Vec<PriceSample> {
        self.samples.iter().cloned().collect()
    }
}
