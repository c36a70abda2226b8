//! Per-poll and per-cycle reports.

use chrono::{DateTime, Utc};
use fxsignal_core::MarketCondition;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of one market data poll over every tracked instrument.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IngestReport {
    /// Instruments asked for a price
    pub polled: usize,
    /// Samples stored in history
    pub ingested: usize,
    /// Instruments skipped (unavailable, timed out or corrupt sample)
    pub skipped: usize,
    /// Trades closed by the gateway while marking
    pub closed: usize,
    /// Newest sample timestamp seen in this poll
    pub latest: Option<DateTime<Utc>>,
}

/// Outcome of one governance cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleReport {
    pub at: DateTime<Utc>,
    pub instruments_evaluated: usize,
    /// Instruments without any history yet
    pub instruments_skipped: usize,
    pub accounts_evaluated: usize,
    /// Accounts whose snapshot was unavailable this cycle
    pub accounts_skipped: usize,
    pub candidates: usize,
    /// Candidates that passed the quality gate
    pub admitted: usize,
    pub approved: usize,
    pub submitted: usize,
    pub filled: usize,
    pub rejected: usize,
    /// Approved signals held back before submission (caps, sizing or a
    /// missing account snapshot); never recorded as signals
    pub held_back: usize,
    pub expired: usize,
    pub adaptations: usize,
    pub reductions: usize,
    pub condition: MarketCondition,
}

impl CycleReport {
    pub fn new(at: DateTime<Utc>) -> Self {
        Self {
            at,
            instruments_evaluated: 0,
            instruments_skipped: 0,
            accounts_evaluated: 0,
            accounts_skipped: 0,
            candidates: 0,
            admitted: 0,
            approved: 0,
            submitted: 0,
            filled: 0,
            rejected: 0,
            held_back: 0,
            expired: 0,
            adaptations: 0,
            reductions: 0,
            condition: MarketCondition::Normal,
        }
    }
}

impl fmt::Display for CycleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} | instruments {}/{} | candidates {} admitted {} approved {} | \
             submitted {} filled {} rejected {} held back {} | condition {}",
            self.at.format("%Y-%m-%d %H:%M:%S"),
            self.instruments_evaluated,
            self.instruments_evaluated + self.instruments_skipped,
            self.candidates,
            self.admitted,
            self.approved,
            self.submitted,
            self.filled,
            self.rejected,
            self.held_back,
            self.condition
        )
    }
}
