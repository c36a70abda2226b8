//! CSV replay provider.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use csv::ReaderBuilder;
use fxsignal_core::error::DataError;
use fxsignal_core::{MarketDataProvider, PriceSample};
use parking_lot::Mutex;
use serde::Deserialize;
use std::collections::{HashMap, VecDeque};
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

/// CSV record format: `timestamp,instrument,bid,ask[,volume]`.
#[derive(Debug, Deserialize)]
struct CsvRecord {
    #[serde(alias = "Timestamp", alias = "time", alias = "date")]
    timestamp: String,
    #[serde(alias = "Instrument", alias = "symbol", alias = "pair")]
    instrument: String,
    #[serde(alias = "Bid")]
    bid: f64,
    #[serde(alias = "Ask")]
    ask: f64,
    #[serde(alias = "Volume", default)]
    volume: Option<f64>,
}

/// Read every sample from a CSV source, sorted by timestamp.
pub fn read_samples<R: Read>(reader: R) -> Result<Vec<PriceSample>, DataError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut samples = Vec::new();
    for (line, result) in reader.deserialize().enumerate() {
        let record: CsvRecord =
            result.map_err(|e| DataError::Parse(format!("row {}: {}", line + 1, e)))?;
        let timestamp = parse_timestamp(&record.timestamp)?;

        let sample = PriceSample::new(record.instrument, record.bid, record.ask, timestamp);
        samples.push(match record.volume {
            Some(volume) => sample.with_volume(volume),
            None => sample,
        });
    }

    samples.sort_by_key(|s| s.timestamp);
    Ok(samples)
}

/// Parse the timestamp formats found in exported tick files.
fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, DataError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }

    let formats = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%d"];
    for format in formats {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(dt.and_utc());
        }
        if let Some(dt) = NaiveDate::parse_from_str(raw, format)
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
        {
            return Ok(dt.and_utc());
        }
    }

    // Unix seconds or milliseconds
    if let Ok(ts) = raw.parse::<i64>() {
        let parsed = if ts > 10_000_000_000 {
            DateTime::from_timestamp_millis(ts)
        } else {
            DateTime::from_timestamp(ts, 0)
        };
        if let Some(dt) = parsed {
            return Ok(dt);
        }
    }

    Err(DataError::Parse(format!("Could not parse timestamp: {}", raw)))
}

/// Replays recorded quotes.
///
/// Each instrument has its own queue; every `get_price` call hands out the
/// next recorded sample for that instrument. An exhausted or unknown
/// instrument is [`DataError::Unavailable`].
#[derive(Debug, Default)]
pub struct CsvReplayProvider {
    queues: HashMap<String, Mutex<VecDeque<PriceSample>>>,
}

impl CsvReplayProvider {
    /// Load a CSV file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, DataError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|e| DataError::Unavailable {
            instrument: "*".to_string(),
            reason: format!("{}: {}", path.display(), e),
        })?;
        let provider = Self::from_samples(read_samples(file)?);
        info!(
            path = %path.display(),
            instruments = provider.queues.len(),
            samples = provider.total_remaining(),
            "Loaded replay data"
        );
        Ok(provider)
    }

    /// Load from any CSV reader.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, DataError> {
        Ok(Self::from_samples(read_samples(reader)?))
    }

    /// Build from samples; each instrument keeps the given order.
    pub fn from_samples(samples: impl IntoIterator<Item = PriceSample>) -> Self {
        let mut grouped: HashMap<String, VecDeque<PriceSample>> = HashMap::new();
        for sample in samples {
            grouped
                .entry(sample.instrument.clone())
                .or_default()
                .push_back(sample);
        }
        Self {
            queues: grouped
                .into_iter()
                .map(|(instrument, queue)| (instrument, Mutex::new(queue)))
                .collect(),
        }
    }

    /// Recorded instruments, sorted.
    pub fn instruments(&self) -> Vec<String> {
        let mut instruments: Vec<String> = self.queues.keys().cloned().collect();
        instruments.sort();
        instruments
    }

    /// Samples left for one instrument.
    pub fn remaining(&self, instrument: &str) -> usize {
        self.queues.get(instrument).map_or(0, |q| q.lock().len())
    }

    pub fn total_remaining(&self) -> usize {
        self.queues.values().map(|q| q.lock().len()).sum()
    }

    pub fn is_exhausted(&self) -> bool {
        self.total_remaining() == 0
    }
}

#[async_trait]
impl MarketDataProvider for CsvReplayProvider {
    async fn get_price(&self, instrument: &str) -> Result<PriceSample, DataError> {
        let queue = self.queues.get(instrument).ok_or_else(|| DataError::Unavailable {
            instrument: instrument.to_string(),
            reason: "no recorded data".to_string(),
        })?;

        let next = queue.lock().pop_front();
        match next {
            Some(sample) => Ok(sample),
            None => {
                debug!(instrument, "Replay exhausted");
                Err(DataError::Unavailable {
                    instrument: instrument.to_string(),
                    reason: "replay exhausted".to_string(),
                })
            }
        }
    }

    fn name(&self) -> &str {
        "csv_replay"
    }
}
