//! Persistence sinks for the signal, trade and adaptation journal.

use async_trait::async_trait;
use fxsignal_core::error::SinkError;
use fxsignal_core::{AdaptationEntry, PersistenceSink, SignalRecord, SinkEntry, TradeRecord};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::info;

/// Appends one JSON object per line to a file.
#[derive(Debug)]
pub struct JsonlSink {
    path: PathBuf,
    file: tokio::sync::Mutex<File>,
}

impl JsonlSink {
    /// Open (creating if needed) a journal file in append mode.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, SinkError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        Ok(Self {
            path,
            file: tokio::sync::Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl PersistenceSink for JsonlSink {
    async fn append(&self, entry: &SinkEntry) -> Result<(), SinkError> {
        let mut line = serde_json::to_vec(entry)?;
        line.push(b'\n');

        let mut file = self.file.lock().await;
        file.write_all(&line).await?;
        file.flush().await?;
        Ok(())
    }

    fn name(&self) -> &str {
        "jsonl"
    }
}

/// Emits each entry as a structured `info` event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

#[async_trait]
impl PersistenceSink for TracingSink {
    async fn append(&self, entry: &SinkEntry) -> Result<(), SinkError> {
        match entry {
            SinkEntry::Signal(record) => info!(
                target: "journal",
                signal_id = %record.id(),
                strategy = %record.signal.strategy_id(),
                state = %record.state,
                "signal"
            ),
            SinkEntry::Trade(record) => info!(
                target: "journal",
                trade_id = %record.trade_id,
                instrument = %record.instrument,
                state = %record.state,
                pips = ?record.pips,
                "trade"
            ),
            SinkEntry::Adaptation(entry) => info!(
                target: "journal",
                account = %entry.account,
                previous = %entry.previous,
                detected = %entry.detected,
                deferred = entry.deferred,
                multiplier = %entry.profile.position_size_multiplier,
                "adaptation"
            ),
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "tracing"
    }
}

/// Keeps every entry in memory. Used by tests and dry runs.
#[derive(Debug, Default)]
pub struct MemorySink {
    entries: Mutex<Vec<SinkEntry>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<SinkEntry> {
        self.entries.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn signals(&self) -> Vec<SignalRecord> {
        self.entries
            .lock()
            .iter()
            .filter_map(|e| match e {
                SinkEntry::Signal(record) => Some(record.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn trades(&self) -> Vec<TradeRecord> {
        self.entries
            .lock()
            .iter()
            .filter_map(|e| match e {
                SinkEntry::Trade(record) => Some(record.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn adaptations(&self) -> Vec<AdaptationEntry> {
        self.entries
            .lock()
            .iter()
            .filter_map(|e| match e {
                SinkEntry::Adaptation(entry) => Some(entry.clone()),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl PersistenceSink for MemorySink {
    async fn append(&self, entry: &SinkEntry) -> Result<(), SinkError> {
        self.entries.lock().push(entry.clone());
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

/// Forwards every entry to each inner sink. All sinks are attempted; the
/// first error is returned.
#[derive(Clone, Default)]
pub struct MultiSink {
    sinks: Vec<Arc<dyn PersistenceSink>>,
}

impl MultiSink {
    pub fn new(sinks: Vec<Arc<dyn PersistenceSink>>) -> Self {
        Self { sinks }
    }

    pub fn push(&mut self, sink: Arc<dyn PersistenceSink>) {
        self.sinks.push(sink);
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

#[async_trait]
impl PersistenceSink for MultiSink {
    async fn append(&self, entry: &SinkEntry) -> Result<(), SinkError> {
        let mut first_error = None;
        for sink in &self.sinks {
            if let Err(e) = sink.append(entry).await {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    fn name(&self) -> &str {
        "multi"
    }
}
