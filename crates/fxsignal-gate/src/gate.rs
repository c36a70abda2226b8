//! Per-strategy gate state behind one lock per strategy.

use crate::confirm::{ConfirmationContext, QualityGate};
use crate::daily::{DailyBook, DailyBookSummary};
use crate::session::SessionFilter;
use chrono::{DateTime, Duration, Utc};
use fxsignal_core::{ApprovedSignal, CandidateSignal};
use fxsignal_indicators::IndicatorSnapshot;
use parking_lot::Mutex;
use std::collections::HashMap;
use tracing::{debug, info};

/// Everything the gate tracks for one strategy.
#[derive(Debug, Clone)]
pub struct StrategyGate {
    pub quality: QualityGate,
    pub book: DailyBook,
    pub sessions: SessionFilter,
    /// Candidates older than this are never approved
    pub signal_expiry: Duration,
}

impl StrategyGate {
    pub fn new(
        quality: QualityGate,
        book: DailyBook,
        sessions: SessionFilter,
        signal_expiry: Duration,
    ) -> Self {
        Self {
            quality,
            book,
            sessions,
            signal_expiry,
        }
    }

    /// Count confirmations and accumulate the candidate if it qualifies.
    ///
    /// # Returns
    /// `true` if the candidate was accumulated.
    pub fn offer(
        &mut self,
        candidate: CandidateSignal,
        prices: &[f64],
        indicators: &IndicatorSnapshot,
        now: DateTime<Utc>,
    ) -> bool {
        let ctx = ConfirmationContext {
            prices,
            indicators,
            active_windows: self.sessions.active_windows(now).len(),
        };
        let confirmations = self.quality.confirm(&candidate, &ctx);

        if confirmations < self.quality.min_confirmations() {
            debug!(
                strategy = %candidate.strategy_id,
                instrument = %candidate.instrument,
                side = %candidate.side,
                confirmations,
                required = self.quality.min_confirmations(),
                "Candidate discarded by quality gate"
            );
            return false;
        }

        debug!(
            strategy = %candidate.strategy_id,
            instrument = %candidate.instrument,
            side = %candidate.side,
            confidence = candidate.confidence,
            confirmations,
            "Candidate accumulated"
        );
        self.book.accumulate(candidate, now);
        true
    }

    /// Walk today's ranking through the session/spacing/pause filter.
    pub fn approve(&mut self, now: DateTime<Utc>, paused: bool) -> Vec<ApprovedSignal> {
        let sessions = &mut self.sessions;
        let approved = self
            .book
            .approve(now, self.signal_expiry, |_| sessions.admit(now, paused));

        for signal in &approved {
            info!(
                signal_id = %signal.id,
                strategy = %signal.candidate.strategy_id,
                instrument = %signal.candidate.instrument,
                side = %signal.candidate.side,
                confidence = signal.candidate.confidence,
                strength = signal.candidate.strength,
                "Signal approved"
            );
        }
        approved
    }
}

/// All strategies' gates, one lock each.
///
/// The set of strategies is fixed at construction, so the map itself is
/// never mutated and needs no lock.
#[derive(Debug, Default)]
pub struct StrategyGates {
    gates: HashMap<String, Mutex<StrategyGate>>,
}

impl StrategyGates {
    pub fn new(gates: impl IntoIterator<Item = (String, StrategyGate)>) -> Self {
        Self {
            gates: gates
                .into_iter()
                .map(|(id, gate)| (id, Mutex::new(gate)))
                .collect(),
        }
    }

    pub fn contains(&self, strategy_id: &str) -> bool {
        self.gates.contains_key(strategy_id)
    }

    /// Run `f` with exclusive access to one strategy's gate.
    pub fn with_gate<R>(
        &self,
        strategy_id: &str,
        f: impl FnOnce(&mut StrategyGate) -> R,
    ) -> Option<R> {
        self.gates.get(strategy_id).map(|gate| f(&mut gate.lock()))
    }

    /// Approved count for `strategy_id` on the book's current day.
    pub fn approved_count(&self, strategy_id: &str) -> usize {
        self.with_gate(strategy_id, |g| g.book.approved_count())
            .unwrap_or_default()
    }

    /// Summaries for every strategy, sorted by id.
    pub fn summaries(&self) -> Vec<DailyBookSummary> {
        let mut summaries: Vec<DailyBookSummary> =
            self.gates.values().map(|g| g.lock().book.summary()).collect();
        summaries.sort_by(|a, b| a.strategy_id.cmp(&b.strategy_id));
        summaries
    }
}
