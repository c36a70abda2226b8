//! Lifecycle tracker owning signal and trade records.

use crate::stats::PerformanceStats;
use chrono::{DateTime, Duration, Utc};
use fxsignal_core::error::LifecycleError;
use fxsignal_core::{ApprovedSignal, OrderTicket, SignalRecord, SignalState, TradeRecord, TradeState};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::collections::HashMap;
use tracing::{error, info};
use uuid::Uuid;

/// Records signal and trade state transitions.
///
/// Every mutating call returns a copy of the updated record so the caller
/// can journal it. Illegal transitions are logged at error level and
/// returned as [`LifecycleError::InvalidTransition`]; the record is left
/// untouched.
#[derive(Debug, Default)]
pub struct LifecycleTracker {
    signals: Mutex<HashMap<Uuid, SignalRecord>>,
    trades: Mutex<HashMap<String, TradeRecord>>,
}

impl LifecycleTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking an approved signal in `Generated`.
    pub fn record_signal(&self, signal: ApprovedSignal, at: DateTime<Utc>) -> SignalRecord {
        let record = SignalRecord::generated(signal, at);
        info!(
            signal_id = %record.id(),
            strategy = %record.signal.strategy_id(),
            instrument = %record.signal.candidate.instrument,
            side = %record.signal.candidate.side,
            "Signal generated"
        );
        self.signals.lock().insert(record.id(), record.clone());
        record
    }

    /// `Generated -> Sent`, linking the trade created for it.
    pub fn mark_sent(
        &self,
        id: Uuid,
        trade_id: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<SignalRecord, LifecycleError> {
        self.update_signal(id, SignalState::Sent, at, |record| {
            if trade_id.is_some() {
                record.trade_id = trade_id;
            }
        })
    }

    /// `Sent -> Executed`.
    pub fn mark_executed(&self, id: Uuid, at: DateTime<Utc>) -> Result<SignalRecord, LifecycleError> {
        self.update_signal(id, SignalState::Executed, at, |_| {})
    }

    /// `Sent -> Expired`.
    pub fn expire_signal(
        &self,
        id: Uuid,
        reason: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Result<SignalRecord, LifecycleError> {
        let reason = reason.into();
        self.update_signal(id, SignalState::Expired, at, |record| record.note = Some(reason))
    }

    /// `Sent -> Cancelled`.
    pub fn cancel_signal(
        &self,
        id: Uuid,
        reason: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Result<SignalRecord, LifecycleError> {
        let reason = reason.into();
        self.update_signal(id, SignalState::Cancelled, at, |record| record.note = Some(reason))
    }

    /// Expire every sent signal generated more than `max_age` ago that has
    /// not been executed.
    pub fn expire_stale(&self, now: DateTime<Utc>, max_age: Duration) -> Vec<SignalRecord> {
        let mut signals = self.signals.lock();
        let mut expired = Vec::new();

        for record in signals.values_mut() {
            if record.state != SignalState::Sent || now - record.generated_at <= max_age {
                continue;
            }
            if record.transition(SignalState::Expired, now).is_ok() {
                record.note = Some("expired before execution".to_string());
                info!(signal_id = %record.id(), "Signal expired");
                expired.push(record.clone());
            }
        }

        expired
    }

    /// Create a `Pending` trade for a submitted ticket.
    pub fn open_trade(
        &self,
        ticket: &OrderTicket,
        signal_id: Option<Uuid>,
        balance_at_entry: Decimal,
        at: DateTime<Utc>,
    ) -> TradeRecord {
        let trade = TradeRecord::pending(ticket, signal_id, balance_at_entry, at);
        info!(
            trade_id = %trade.trade_id,
            account = %trade.account,
            instrument = %trade.instrument,
            side = %trade.side,
            units = %trade.units,
            "Trade pending"
        );
        self.trades.lock().insert(trade.trade_id.clone(), trade.clone());
        trade
    }

    /// `Pending -> Filled`.
    pub fn fill_trade(
        &self,
        trade_id: &str,
        broker_trade_id: &str,
        fill_price: Decimal,
        at: DateTime<Utc>,
    ) -> Result<TradeRecord, LifecycleError> {
        self.update_trade(trade_id, |trade| trade.fill(broker_trade_id, fill_price, at))
    }

    /// `Pending -> Rejected`.
    pub fn reject_trade(
        &self,
        trade_id: &str,
        reason: &str,
        at: DateTime<Utc>,
    ) -> Result<TradeRecord, LifecycleError> {
        self.update_trade(trade_id, |trade| trade.reject(reason, at))
    }

    /// `Pending -> Cancelled`.
    pub fn cancel_trade(
        &self,
        trade_id: &str,
        reason: &str,
        at: DateTime<Utc>,
    ) -> Result<TradeRecord, LifecycleError> {
        self.update_trade(trade_id, |trade| trade.cancel(reason, at))
    }

    /// `Filled -> Closed`, computing realized metrics.
    pub fn close_trade(
        &self,
        trade_id: &str,
        exit_price: Decimal,
        at: DateTime<Utc>,
    ) -> Result<TradeRecord, LifecycleError> {
        self.update_trade(trade_id, |trade| trade.close(exit_price, at))
    }

    /// Feed an intermediate price to every filled trade on `instrument`.
    /// Returns the number of trades updated.
    pub fn mark_price(&self, instrument: &str, price: Decimal) -> usize {
        self.trades
            .lock()
            .values_mut()
            .filter(|t| t.instrument == instrument)
            .map(|t| t.mark_price(price))
            .filter(|updated| *updated)
            .count()
    }

    pub fn signal(&self, id: Uuid) -> Option<SignalRecord> {
        self.signals.lock().get(&id).cloned()
    }

    pub fn trade(&self, trade_id: &str) -> Option<TradeRecord> {
        self.trades.lock().get(trade_id).cloned()
    }

    /// Trades in `state`, oldest first.
    pub fn trades_in(&self, state: TradeState) -> Vec<TradeRecord> {
        let mut trades: Vec<TradeRecord> = self
            .trades
            .lock()
            .values()
            .filter(|t| t.state == state)
            .cloned()
            .collect();
        trades.sort_by_key(|t| t.created_at);
        trades
    }

    /// Number of signals in `state`.
    pub fn signal_count(&self, state: SignalState) -> usize {
        self.signals.lock().values().filter(|s| s.state == state).count()
    }

    /// Statistics over all closed trades.
    pub fn stats(&self) -> PerformanceStats {
        let trades = self.trades.lock();
        PerformanceStats::from_trades(trades.values())
    }

    fn update_signal(
        &self,
        id: Uuid,
        next: SignalState,
        at: DateTime<Utc>,
        on_success: impl FnOnce(&mut SignalRecord),
    ) -> Result<SignalRecord, LifecycleError> {
        let mut signals = self.signals.lock();
        let record = signals.get_mut(&id).ok_or_else(|| {
            error!(signal_id = %id, "Transition on unknown signal");
            LifecycleError::NotFound {
                entity: "signal",
                id: id.to_string(),
            }
        })?;

        let from = record.state;
        if let Err(e) = record.transition(next, at) {
            error!(signal_id = %id, error = %e, "Invalid signal transition");
            return Err(e);
        }
        on_success(record);

        info!(signal_id = %id, %from, to = %next, "Signal transition");
        Ok(record.clone())
    }

    fn update_trade(
        &self,
        trade_id: &str,
        apply: impl FnOnce(&mut TradeRecord) -> Result<(), LifecycleError>,
    ) -> Result<TradeRecord, LifecycleError> {
        let mut trades = self.trades.lock();
        let trade = trades.get_mut(trade_id).ok_or_else(|| {
            error!(trade_id, "Transition on unknown trade");
            LifecycleError::NotFound {
                entity: "trade",
                id: trade_id.to_string(),
            }
        })?;

        let from = trade.state;
        if let Err(e) = apply(trade) {
            error!(trade_id, error = %e, "Invalid trade transition");
            return Err(e);
        }

        info!(
            trade_id,
            instrument = %trade.instrument,
            %from,
            to = %trade.state,
            pips = ?trade.pips,
            profit_loss = ?trade.profit_loss,
            "Trade transition"
        );
        Ok(trade.clone())
    }
}
