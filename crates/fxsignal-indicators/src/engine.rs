//! Indicator engine: owns every instrument's rolling history.
//!
//! Ingestion and evaluation run on different tasks. Each instrument has its
//! own lock; the map lock is only taken to find or create a slot. The
//! evaluation side never reads live histories, it works from a
//! [`HistorySnapshot`] copied at cycle start.

use crate::history::RollingHistory;
use chrono::{DateTime, Utc};
use fxsignal_core::PriceSample;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Default history capacity per instrument.
pub const DEFAULT_CAPACITY: usize = 200;

type Slot = Arc<Mutex<RollingHistory>>;

/// Per-instrument bounded history store.
#[derive(Debug)]
pub struct IndicatorEngine {
    capacity: usize,
    histories: RwLock<HashMap<String, Slot>>,
}

impl Default for IndicatorEngine {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl IndicatorEngine {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            histories: RwLock::new(HashMap::new()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn slot(&self, instrument: &str) -> Slot {
        if let Some(slot) = self.histories.read().get(instrument) {
            return Arc::clone(slot);
        }

        let mut map = self.histories.write();
        Arc::clone(map.entry(instrument.to_string()).or_insert_with(|| {
            debug!(instrument, capacity = self.capacity, "Tracking new instrument");
            Arc::new(Mutex::new(RollingHistory::new(instrument, self.capacity)))
        }))
    }

    /// Append a sample to its instrument's history.
    ///
    /// Corrupt samples (non-finite or non-positive prices, crossed quotes)
    /// and samples older than the newest stored one are dropped with a
    /// warning. A repeat of the newest timestamp is dropped silently.
    ///
    /// # Returns
    /// `true` if the sample was stored.
    pub fn ingest(&self, sample: PriceSample) -> bool {
        if !sample.is_valid() {
            warn!(
                instrument = %sample.instrument,
                bid = sample.bid,
                ask = sample.ask,
                "Dropping invalid price sample"
            );
            return false;
        }

        let slot = self.slot(&sample.instrument);
        let mut history = slot.lock();

        if let Some(last) = history.last() {
            if sample.timestamp == last.timestamp {
                trace!(
                    instrument = %sample.instrument,
                    sample_time = %sample.timestamp,
                    "Dropping repeated price sample"
                );
                return false;
            }
            if sample.timestamp < last.timestamp {
                warn!(
                    instrument = %sample.instrument,
                    sample_time = %sample.timestamp,
                    last_time = %last.timestamp,
                    "Dropping out-of-order price sample"
                );
                return false;
            }
        }

        history.push(sample);
        true
    }

    /// Number of stored samples for `instrument`.
    pub fn len(&self, instrument: &str) -> usize {
        self.histories
            .read()
            .get(instrument)
            .map(|slot| slot.lock().len())
            .unwrap_or(0)
    }

    /// Instruments with at least one stored sample, sorted.
    pub fn instruments(&self) -> Vec<String> {
        let mut names: Vec<String> = self.histories.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Copy the requested histories for one evaluation cycle.
    ///
    /// Each instrument is copied under its own lock. Instruments never seen
    /// are absent from the snapshot.
    pub fn snapshot(&self, instruments: &[String], taken_at: DateTime<Utc>) -> HistorySnapshot {
        let slots: Vec<(String, Slot)> = {
            let map = self.histories.read();
            instruments
                .iter()
                .filter_map(|name| map.get(name).map(|slot| (name.clone(), Arc::clone(slot))))
                .collect()
        };

        let histories = slots
            .into_iter()
            .map(|(name, slot)| {
                let samples = slot.lock().to_vec();
                (name, samples)
            })
            .collect();

        HistorySnapshot { taken_at, histories }
    }
}

/// Owned copy of several instruments' histories taken at cycle start.
#[derive(Debug, Clone, Default)]
pub struct HistorySnapshot {
    taken_at: DateTime<Utc>,
    histories: HashMap<String, Vec<PriceSample>>,
}

impl HistorySnapshot {
    /// Build a snapshot directly from sample lists.
    pub fn from_samples(
        taken_at: DateTime<Utc>,
        histories: impl IntoIterator<Item = (String, Vec<PriceSample>)>,
    ) -> Self {
        Self {
            taken_at,
            histories: histories.into_iter().collect(),
        }
    }

    pub fn taken_at(&self) -> DateTime<Utc> {
        self.taken_at
    }

    /// Samples for `instrument`, oldest first; empty if untracked.
    pub fn samples(&self, instrument: &str) -> &[PriceSample] {
        self.histories
            .get(instrument)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Mid prices for `instrument`, oldest first.
    pub fn mids(&self, instrument: &str) -> Vec<f64> {
        self.samples(instrument).iter().map(|s| s.mid).collect()
    }

    /// Most recent sample for `instrument`.
    pub fn latest(&self, instrument: &str) -> Option<&PriceSample> {
        self.samples(instrument).last()
    }

    pub fn contains(&self, instrument: &str) -> bool {
        self.histories.contains_key(instrument)
    }

    pub fn len(&self) -> usize {
        self.histories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.histories.is_empty()
    }
}
