//! Persistence sink trait and journal entries.

use crate::error::SinkError;
use crate::types::{MarketCondition, RiskProfile, SignalRecord, TradeRecord};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A risk-governor adaptation (or deferred adaptation) worth recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdaptationEntry {
    /// Account adapted
    pub account: String,
    /// Condition previously applied
    pub previous: MarketCondition,
    /// Condition detected this evaluation
    pub detected: MarketCondition,
    /// Profile in force after the evaluation
    pub profile: RiskProfile,
    /// True when the cooldown deferred the change
    pub deferred: bool,
    /// Evaluation time
    pub at: DateTime<Utc>,
}

/// One journal line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SinkEntry {
    Signal(SignalRecord),
    Trade(TradeRecord),
    Adaptation(AdaptationEntry),
}

/// Append-only record of signals, trades and adaptations.
///
/// Failures are logged by the caller and never abort the pipeline.
#[async_trait]
pub trait PersistenceSink: Send + Sync {
    /// Append one entry.
    async fn append(&self, entry: &SinkEntry) -> Result<(), SinkError>;

    /// Get the sink name.
    fn name(&self) -> &str;
}
