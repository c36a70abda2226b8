//! Per-strategy daily candidate book and top-K selection.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Utc};
use fxsignal_core::{ApprovedSignal, CandidateSignal};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::{debug, info};

use crate::session::Rejection;

/// Reporting view of one strategy's day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyBookSummary {
    pub strategy_id: String,
    pub date: Option<NaiveDate>,
    pub accumulated: usize,
    pub approved: usize,
    pub cap: usize,
}

/// The day's accumulated candidates and approvals for one strategy.
///
/// The book rolls over to a new calendar day (in the strategy's timezone)
/// at the start of any operation that observes a new date, so reset and
/// subsequent reads happen under the same borrow.
#[derive(Debug, Clone)]
pub struct DailyBook {
    strategy_id: String,
    offset: FixedOffset,
    max_daily_quality_trades: usize,
    max_trades_per_day: usize,
    day: Option<NaiveDate>,
    candidates: Vec<CandidateSignal>,
    approved: Vec<usize>,
}

impl DailyBook {
    pub fn new(
        strategy_id: impl Into<String>,
        offset: FixedOffset,
        max_daily_quality_trades: usize,
        max_trades_per_day: usize,
    ) -> Self {
        Self {
            strategy_id: strategy_id.into(),
            offset,
            max_daily_quality_trades,
            max_trades_per_day,
            day: None,
            candidates: Vec::new(),
            approved: Vec::new(),
        }
    }

    pub fn strategy_id(&self) -> &str {
        &self.strategy_id
    }

    /// Approvals allowed per day.
    pub fn cap(&self) -> usize {
        self.max_daily_quality_trades.min(self.max_trades_per_day)
    }

    pub fn approved_count(&self) -> usize {
        self.approved.len()
    }

    pub fn accumulated(&self) -> usize {
        self.candidates.len()
    }

    pub fn day(&self) -> Option<NaiveDate> {
        self.day
    }

    /// Reset the book if `now` falls on a new local date.
    ///
    /// # Returns
    /// `true` if a reset happened.
    pub fn roll(&mut self, now: DateTime<Utc>) -> bool {
        let today = now.with_timezone(&self.offset).date_naive();
        if self.day == Some(today) {
            return false;
        }

        if self.day.is_some() {
            info!(
                strategy = %self.strategy_id,
                previous = ?self.day,
                date = %today,
                accumulated = self.candidates.len(),
                approved = self.approved.len(),
                "Daily book reset"
            );
        }
        self.day = Some(today);
        self.candidates.clear();
        self.approved.clear();
        true
    }

    /// Add a candidate to today's list.
    pub fn accumulate(&mut self, candidate: CandidateSignal, now: DateTime<Utc>) {
        self.roll(now);
        self.candidates.push(candidate);
    }

    /// Indices of all of today's candidates, best first.
    ///
    /// Sorted by `(confidence, strength)` descending; the sort is stable so
    /// equal keys keep arrival order.
    fn ranked(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.candidates.len()).collect();
        order.sort_by(|&a, &b| rank_desc(&self.candidates[a], &self.candidates[b]));
        order
    }

    /// Today's top `max_daily_quality_trades` candidates, best first.
    ///
    /// Re-ranks the whole day's set on every call.
    pub fn select_daily(&mut self, now: DateTime<Utc>) -> Vec<CandidateSignal> {
        self.roll(now);
        self.ranked()
            .into_iter()
            .take(self.max_daily_quality_trades)
            .map(|i| self.candidates[i].clone())
            .collect()
    }

    /// Approve today's candidates in rank order.
    ///
    /// Ranks every unapproved candidate of the day, so stale or held-back
    /// leaders never crowd out fresh ones. Already-approved candidates and
    /// those older than `expiry` are skipped.
    /// Each remaining candidate goes through `admit`; the walk stops at the
    /// first rejection or once the daily cap is reached.
    pub fn approve<F>(
        &mut self,
        now: DateTime<Utc>,
        expiry: Duration,
        mut admit: F,
    ) -> Vec<ApprovedSignal>
    where
        F: FnMut(&CandidateSignal) -> Result<(), Rejection>,
    {
        self.roll(now);
        let cap = self.cap();
        let mut newly_approved = Vec::new();

        for idx in self.ranked() {
            if self.approved.len() >= cap {
                debug!(strategy = %self.strategy_id, cap, "Daily cap reached");
                break;
            }
            if self.approved.contains(&idx) {
                continue;
            }

            let candidate = &self.candidates[idx];
            if now - candidate.timestamp > expiry {
                debug!(
                    strategy = %self.strategy_id,
                    instrument = %candidate.instrument,
                    generated_at = %candidate.timestamp,
                    "Skipping stale candidate"
                );
                continue;
            }

            if let Err(reason) = admit(candidate) {
                debug!(
                    strategy = %self.strategy_id,
                    instrument = %candidate.instrument,
                    %reason,
                    "Candidate held back"
                );
                break;
            }

            self.approved.push(idx);
            newly_approved.push(ApprovedSignal::new(candidate.clone(), now));
        }

        newly_approved
    }

    pub fn summary(&self) -> DailyBookSummary {
        DailyBookSummary {
            strategy_id: self.strategy_id.clone(),
            date: self.day,
            accumulated: self.candidates.len(),
            approved: self.approved.len(),
            cap: self.cap(),
        }
    }
}

fn rank_desc(a: &CandidateSignal, b: &CandidateSignal) -> Ordering {
    b.confidence
        .total_cmp(&a.confidence)
        .then_with(|| b.strength.total_cmp(&a.strength))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use fxsignal_core::{RationaleTag, Side};

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn at(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, day, hour, minute, 0).unwrap()
    }

    fn candidate(confidence: f64, strength: f64, ts: DateTime<Utc>) -> CandidateSignal {
        CandidateSignal::new(
            "EUR_USD",
            Side::Buy,
            confidence,
            strength,
            "trend",
            RationaleTag::EmaAlignment,
            1.1,
            ts,
        )
    }

    fn eleven_candidates(book: &mut DailyBook, now: DateTime<Utc>) {
        let scores = [
            (0.61, 0.2),
            (0.90, 0.1),
            (0.55, 0.9),
            (0.75, 0.3),
            (0.90, 0.4),
            (0.30, 0.3),
            (0.82, 0.5),
            (0.45, 0.8),
            (0.75, 0.7),
            (0.66, 0.6),
            (0.20, 0.1),
        ];
        for (c, s) in scores {
            book.accumulate(candidate(c, s, now), now);
        }
    }

    #[test]
    fn test_select_daily_top_five() {
        let now = at(4, 10, 0);
        let mut book = DailyBook::new("trend", utc(), 5, 10);
        eleven_candidates(&mut book, now);

        let top: Vec<(f64, f64)> = book.select_daily(now).iter().map(|c| c.rank_key()).collect();
        assert_eq!(
            top,
            vec![(0.90, 0.4), (0.90, 0.1), (0.82, 0.5), (0.75, 0.7), (0.75, 0.3)]
        );
        // idempotent
        let again: Vec<(f64, f64)> = book.select_daily(now).iter().map(|c| c.rank_key()).collect();
        assert_eq!(top, again);
    }

    #[test]
    fn test_ties_keep_arrival_order() {
        let now = at(4, 10, 0);
        let mut book = DailyBook::new("trend", utc(), 2, 10);
        let first = candidate(0.7, 0.5, now).with_indicator("order", 1.0);
        let second = candidate(0.7, 0.5, now).with_indicator("order", 2.0);
        book.accumulate(first, now);
        book.accumulate(second, now);

        let top = book.select_daily(now);
        assert_eq!(top[0].indicators["order"], 1.0);
        assert_eq!(top[1].indicators["order"], 2.0);
    }

    #[test]
    fn test_reranks_after_new_candidates() {
        let now = at(4, 10, 0);
        let mut book = DailyBook::new("trend", utc(), 1, 10);
        book.accumulate(candidate(0.6, 0.5, now), now);
        assert_eq!(book.select_daily(now)[0].confidence, 0.6);

        book.accumulate(candidate(0.8, 0.5, now), now);
        assert_eq!(book.select_daily(now)[0].confidence, 0.8);
    }

    #[test]
    fn test_approve_respects_cap() {
        let now = at(4, 10, 0);
        let mut book = DailyBook::new("trend", utc(), 5, 10);
        eleven_candidates(&mut book, now);

        let approved = book.approve(now, Duration::minutes(30), |_| Ok(()));
        assert_eq!(approved.len(), 5);
        assert_eq!(approved[0].candidate.rank_key(), (0.90, 0.4));
        assert_eq!(book.approved_count(), 5);

        // a second pass approves nothing new
        let again = book.approve(now, Duration::minutes(30), |_| Ok(()));
        assert!(again.is_empty());
        assert_eq!(book.approved_count(), 5);
    }

    #[test]
    fn test_cap_uses_max_trades_per_day() {
        let now = at(4, 10, 0);
        let mut book = DailyBook::new("trend", utc(), 5, 2);
        eleven_candidates(&mut book, now);

        assert_eq!(book.cap(), 2);
        assert_eq!(book.approve(now, Duration::minutes(30), |_| Ok(())).len(), 2);
    }

    #[test]
    fn test_approve_skips_stale_and_stops_on_rejection() {
        let now = at(4, 10, 0);
        let mut book = DailyBook::new("trend", utc(), 5, 5);
        book.accumulate(candidate(0.9, 0.9, now - Duration::hours(2)), now);
        book.accumulate(candidate(0.8, 0.5, now), now);
        book.accumulate(candidate(0.7, 0.5, now), now);

        let mut calls = 0;
        let approved = book.approve(now, Duration::minutes(30), |_| {
            calls += 1;
            if calls == 1 {
                Ok(())
            } else {
                Err(Rejection::Spacing { remaining_secs: 60 })
            }
        });

        assert_eq!(approved.len(), 1);
        assert_eq!(approved[0].candidate.confidence, 0.8);
        assert_eq!(calls, 2);
    }

    #[test]
    fn test_stale_leaders_do_not_block_fresh_candidates() {
        let morning = at(4, 9, 0);
        let mut book = DailyBook::new("trend", utc(), 2, 5);
        book.accumulate(candidate(0.9, 0.5, morning), morning);
        book.accumulate(candidate(0.85, 0.5, morning), morning);

        let held = book.approve(morning, Duration::minutes(30), |_| {
            Err(Rejection::OutsideSession)
        });
        assert!(held.is_empty());

        let later = at(4, 11, 0);
        book.accumulate(candidate(0.5, 0.5, later), later);
        // top-K still reports the day's leaders
        assert_eq!(book.select_daily(later)[0].confidence, 0.9);

        let approved = book.approve(later, Duration::minutes(30), |_| Ok(()));
        assert_eq!(approved.len(), 1);
        assert_eq!(approved[0].candidate.confidence, 0.5);
        assert_eq!(book.approved_count(), 1);
        assert_eq!(book.cap(), 2);
    }

    #[test]
    fn test_rollover_clears_selection() {
        let mut book = DailyBook::new("trend", utc(), 5, 10);
        let monday = at(4, 21, 0);
        eleven_candidates(&mut book, monday);
        book.approve(monday, Duration::minutes(30), |_| Ok(()));
        assert_eq!(book.approved_count(), 5);

        let tuesday = at(5, 0, 5);
        assert!(book.select_daily(tuesday).is_empty());
        assert_eq!(book.approved_count(), 0);
        assert_eq!(book.day(), Some(tuesday.date_naive()));
    }

    #[test]
    fn test_rollover_uses_strategy_timezone() {
        // UTC-5: 2024-03-05 03:00 UTC is still 2024-03-04 locally
        let mut book = DailyBook::new("trend", FixedOffset::west_opt(5 * 3600).unwrap(), 5, 10);
        book.accumulate(candidate(0.7, 0.5, at(4, 20, 0)), at(4, 20, 0));

        assert!(!book.roll(at(5, 3, 0)));
        assert_eq!(book.accumulated(), 1);
        assert!(book.roll(at(5, 6, 0)));
        assert_eq!(book.accumulated(), 0);
    }

    #[test]
    fn test_summary() {
        let now = at(4, 10, 0);
        let mut book = DailyBook::new("trend", utc(), 3, 10);
        book.accumulate(candidate(0.7, 0.5, now), now);

        let summary = book.summary();
        assert_eq!(summary.accumulated, 1);
        assert_eq!(summary.approved, 0);
        assert_eq!(summary.cap, 3);
        assert_eq!(summary.date, Some(now.date_naive()));
    }
}
