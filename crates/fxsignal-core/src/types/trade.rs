//! Trade records and the trade state machine.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{to_pips, OrderTicket, Side};
use crate::error::LifecycleError;

/// Trade lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeState {
    Pending,
    Filled,
    Rejected,
    Cancelled,
    Closed,
}

impl TradeState {
    /// Check if the trade is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TradeState::Rejected | TradeState::Cancelled | TradeState::Closed
        )
    }

    /// Legal edges: `Pending -> {Filled | Rejected | Cancelled}`, `Filled -> Closed`.
    pub fn can_transition_to(&self, next: TradeState) -> bool {
        matches!(
            (self, next),
            (TradeState::Pending, TradeState::Filled)
                | (TradeState::Pending, TradeState::Rejected)
                | (TradeState::Pending, TradeState::Cancelled)
                | (TradeState::Filled, TradeState::Closed)
        )
    }
}

impl std::fmt::Display for TradeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TradeState::Pending => "pending",
            TradeState::Filled => "filled",
            TradeState::Rejected => "rejected",
            TradeState::Cancelled => "cancelled",
            TradeState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// A trade from order submission to completion.
///
/// Pip figures are expressed in pips of the instrument and signed so that a
/// positive value is in the trade's favour, except `fill_slippage_pips` which
/// is positive when the fill was worse than planned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    /// Lifecycle trade id (also the gateway client id)
    pub trade_id: String,
    /// Broker-side id, known once filled
    pub broker_trade_id: Option<String>,
    /// Signal this trade was opened from
    pub signal_id: Option<Uuid>,
    /// Account
    pub account: String,
    /// Instrument
    pub instrument: String,
    /// Buy or sell
    pub side: Side,
    /// Units traded
    pub units: Decimal,
    /// Price the order was planned at
    pub planned_price: Decimal,
    /// Executed entry price
    pub entry_price: Option<Decimal>,
    /// Executed exit price
    pub exit_price: Option<Decimal>,
    /// Stop-loss price
    pub stop_loss: Decimal,
    /// Take-profit price
    pub take_profit: Decimal,
    /// Current state
    pub state: TradeState,
    /// Submission time
    pub created_at: DateTime<Utc>,
    /// Fill time
    pub opened_at: Option<DateTime<Utc>>,
    /// Close/reject/cancel time
    pub closed_at: Option<DateTime<Utc>>,
    /// Account balance when the order was submitted
    pub balance_at_entry: Decimal,
    /// `(fill - planned) * sign(side)` in pips
    pub fill_slippage_pips: Option<Decimal>,
    /// Realized pips
    pub pips: Option<Decimal>,
    /// Realized profit/loss in quote currency
    pub profit_loss: Option<Decimal>,
    /// Realized profit/loss as a percentage of `balance_at_entry`
    pub profit_loss_pct: Option<Decimal>,
    /// Seconds between fill and close
    pub duration_secs: Option<i64>,
    /// Best excursion seen between fill and close, in pips
    pub max_favorable_pips: Option<Decimal>,
    /// Worst excursion seen between fill and close, in pips (non-negative)
    pub max_adverse_pips: Option<Decimal>,
    /// Rejection or cancellation reason
    pub note: Option<String>,
}

impl TradeRecord {
    /// Create a pending trade from a submitted ticket.
    pub fn pending(
        ticket: &OrderTicket,
        signal_id: Option<Uuid>,
        balance_at_entry: Decimal,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            trade_id: ticket.client_id.clone(),
            broker_trade_id: None,
            signal_id,
            account: ticket.account.clone(),
            instrument: ticket.instrument.clone(),
            side: ticket.side,
            units: ticket.units,
            planned_price: ticket.planned_price,
            entry_price: None,
            exit_price: None,
            stop_loss: ticket.stop_loss,
            take_profit: ticket.take_profit,
            state: TradeState::Pending,
            created_at,
            opened_at: None,
            closed_at: None,
            balance_at_entry,
            fill_slippage_pips: None,
            pips: None,
            profit_loss: None,
            profit_loss_pct: None,
            duration_secs: None,
            max_favorable_pips: None,
            max_adverse_pips: None,
            note: None,
        }
    }

    fn advance(&mut self, next: TradeState) -> Result<(), LifecycleError> {
        if !self.state.can_transition_to(next) {
            return Err(LifecycleError::InvalidTransition {
                entity: "trade",
                id: self.trade_id.clone(),
                from: self.state.to_string(),
                to: next.to_string(),
            });
        }
        self.state = next;
        Ok(())
    }

    /// Record the fill reported by the gateway.
    pub fn fill(
        &mut self,
        broker_trade_id: impl Into<String>,
        fill_price: Decimal,
        at: DateTime<Utc>,
    ) -> Result<(), LifecycleError> {
        self.advance(TradeState::Filled)?;
        self.broker_trade_id = Some(broker_trade_id.into());
        self.entry_price = Some(fill_price);
        self.opened_at = Some(at);
        self.fill_slippage_pips = Some(to_pips(
            (fill_price - self.planned_price) * self.side.sign(),
            &self.instrument,
        ));
        Ok(())
    }

    /// Mark the order as rejected by the gateway.
    pub fn reject(&mut self, reason: impl Into<String>, at: DateTime<Utc>) -> Result<(), LifecycleError> {
        self.advance(TradeState::Rejected)?;
        self.note = Some(reason.into());
        self.closed_at = Some(at);
        Ok(())
    }

    /// Cancel the order before it filled.
    pub fn cancel(&mut self, reason: impl Into<String>, at: DateTime<Utc>) -> Result<(), LifecycleError> {
        self.advance(TradeState::Cancelled)?;
        self.note = Some(reason.into());
        self.closed_at = Some(at);
        Ok(())
    }

    /// Feed an intermediate market price to the excursion trackers.
    /// Returns `false` (and changes nothing) unless the trade is filled.
    pub fn mark_price(&mut self, price: Decimal) -> bool {
        let entry = match (self.state, self.entry_price) {
            (TradeState::Filled, Some(entry)) => entry,
            _ => return false,
        };

        let excursion = to_pips((price - entry) * self.side.sign(), &self.instrument);
        let favorable = excursion.max(Decimal::ZERO);
        let adverse = (-excursion).max(Decimal::ZERO);

        self.max_favorable_pips = Some(self.max_favorable_pips.map_or(favorable, |m| m.max(favorable)));
        self.max_adverse_pips = Some(self.max_adverse_pips.map_or(adverse, |m| m.max(adverse)));
        true
    }

    /// Close the trade and compute realized metrics.
    pub fn close(&mut self, exit_price: Decimal, at: DateTime<Utc>) -> Result<(), LifecycleError> {
        self.advance(TradeState::Closed)?;

        // A filled trade always carries its entry price.
        let entry = self.entry_price.unwrap_or(self.planned_price);
        let price_move = (exit_price - entry) * self.side.sign();
        let profit_loss = price_move * self.units;

        self.exit_price = Some(exit_price);
        self.closed_at = Some(at);
        self.pips = Some(to_pips(price_move, &self.instrument));
        self.profit_loss = Some(profit_loss);
        self.profit_loss_pct = if self.balance_at_entry > Decimal::ZERO {
            Some(profit_loss / self.balance_at_entry * dec!(100))
        } else {
            None
        };
        self.duration_secs = self.opened_at.map(|opened| (at - opened).num_seconds());
        Ok(())
    }

    /// Check if the trade reached a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn ticket(side: Side, instrument: &str, planned: Decimal) -> OrderTicket {
        OrderTicket {
            client_id: "T-1".to_string(),
            account: "primary".to_string(),
            instrument: instrument.to_string(),
            side,
            units: dec!(10000),
            planned_price: planned,
            stop_loss: planned - dec!(0.0020),
            take_profit: planned + dec!(0.0040),
        }
    }

    #[test]
    fn test_buy_round_trip_metrics() {
        let opened = Utc::now();
        let mut trade = TradeRecord::pending(&ticket(Side::Buy, "EUR_USD", dec!(1.1000)), None, dec!(10000), opened);

        trade.fill("B-77", dec!(1.1002), opened).unwrap();
        assert_eq!(trade.fill_slippage_pips, Some(dec!(2)));

        let closed = opened + Duration::minutes(45);
        trade.close(dec!(1.1032), closed).unwrap();

        assert_eq!(trade.pips, Some(dec!(30)));
        assert_eq!(trade.profit_loss, Some(dec!(30)));
        assert_eq!(trade.profit_loss_pct, Some(dec!(0.3)));
        assert_eq!(trade.duration_secs, Some(2700));
        assert!(trade.is_terminal());
    }

    #[test]
    fn test_sell_pips_positive_when_price_falls() {
        let now = Utc::now();
        let mut trade = TradeRecord::pending(&ticket(Side::Sell, "USD_JPY", dec!(150.00)), None, dec!(1000000), now);

        trade.fill("B-1", dec!(150.00), now).unwrap();
        trade.close(dec!(149.50), now).unwrap();

        assert_eq!(trade.pips, Some(dec!(50)));
        assert!(trade.profit_loss.unwrap() > Decimal::ZERO);
    }

    #[test]
    fn test_excursions_tracked_only_while_filled() {
        let now = Utc::now();
        let mut trade = TradeRecord::pending(&ticket(Side::Buy, "EUR_USD", dec!(1.1000)), None, dec!(10000), now);

        assert!(!trade.mark_price(dec!(1.1010)));
        assert_eq!(trade.max_favorable_pips, None);

        trade.fill("B-2", dec!(1.1000), now).unwrap();
        assert!(trade.mark_price(dec!(1.1015)));
        assert!(trade.mark_price(dec!(1.0990)));
        assert!(trade.mark_price(dec!(1.1005)));

        assert_eq!(trade.max_favorable_pips, Some(dec!(15)));
        assert_eq!(trade.max_adverse_pips, Some(dec!(10)));
    }

    #[test]
    fn test_illegal_transitions_fail() {
        let now = Utc::now();
        let mut trade = TradeRecord::pending(&ticket(Side::Buy, "EUR_USD", dec!(1.1000)), None, dec!(10000), now);

        assert!(trade.close(dec!(1.1), now).is_err());
        trade.fill("B-3", dec!(1.1000), now).unwrap();
        trade.close(dec!(1.1010), now).unwrap();

        let err = trade.fill("B-3", dec!(1.1000), now).unwrap_err();
        assert_eq!(
            err,
            LifecycleError::InvalidTransition {
                entity: "trade",
                id: "T-1".to_string(),
                from: "closed".to_string(),
                to: "filled".to_string(),
            }
        );
        assert_eq!(trade.state, TradeState::Closed);
    }
}
