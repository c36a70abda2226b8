//! Paper order gateway for dry runs and simulation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fxsignal_core::error::GatewayError;
use fxsignal_core::{
    pip_size, AccountSnapshot, OrderGateway, OrderTicket, PositionClosed, ReductionRequest, Side,
    Submission,
};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{info, warn};

/// Paper gateway settings.
#[derive(Debug, Clone, PartialEq)]
pub struct PaperConfig {
    /// Adverse slippage applied to every fill, in pips
    pub slippage_pips: Decimal,
    /// Notional / margin ratio
    pub leverage: Decimal,
}

impl Default for PaperConfig {
    fn default() -> Self {
        Self {
            slippage_pips: dec!(0.5),
            leverage: dec!(30),
        }
    }
}

#[derive(Debug, Clone)]
struct PaperPosition {
    client_id: String,
    instrument: String,
    side: Side,
    units: Decimal,
    entry: Decimal,
    stop_loss: Decimal,
    take_profit: Decimal,
    mark: Decimal,
}

impl PaperPosition {
    /// Unrealized P&L converted to the account currency.
    fn unrealized(&self) -> Decimal {
        to_account_currency(
            &self.instrument,
            (self.mark - self.entry) * self.side.sign() * self.units,
            self.mark,
        )
    }

    fn margin(&self, leverage: Decimal) -> Decimal {
        notional(&self.instrument, self.units, self.entry) / leverage
    }

    fn exit_trigger(&self) -> Option<&'static str> {
        let favourable = (self.mark - self.take_profit) * self.side.sign() >= Decimal::ZERO;
        let adverse = (self.stop_loss - self.mark) * self.side.sign() >= Decimal::ZERO;
        if adverse {
            Some("stop_loss")
        } else if favourable {
            Some("take_profit")
        } else {
            None
        }
    }
}

#[derive(Debug)]
struct PaperAccount {
    balance: Decimal,
    positions: Vec<PaperPosition>,
}

impl PaperAccount {
    fn margin_used(&self, leverage: Decimal) -> Decimal {
        self.positions.iter().map(|p| p.margin(leverage)).sum()
    }

    fn close(&mut self, index: usize) -> PaperPosition {
        let position = self.positions.remove(index);
        self.balance += position.unrealized();
        position
    }
}

/// Account-currency notional. `USD_xxx` pairs are already denominated in
/// the base currency; everything else is approximated as quote = account.
fn notional(instrument: &str, units: Decimal, price: Decimal) -> Decimal {
    if instrument.starts_with("USD_") {
        units
    } else {
        units * price
    }
}

fn to_account_currency(instrument: &str, quote_amount: Decimal, price: Decimal) -> Decimal {
    if instrument.starts_with("USD_") && price > Decimal::ZERO {
        quote_amount / price
    } else {
        quote_amount
    }
}

/// Simulated broker.
///
/// Fills immediately at the planned price plus adverse slippage, stamped
/// with the latest marked time (wall clock before the first mark), books
/// margin against the account balance and closes positions when a marked
/// price crosses their stop or target. Positions closed by a stop, target
/// or reduction are reported from the next
/// [`mark_price`](OrderGateway::mark_price) call.
#[derive(Debug)]
pub struct PaperGateway {
    config: PaperConfig,
    accounts: HashMap<String, Mutex<PaperAccount>>,
    closed: Mutex<Vec<PositionClosed>>,
    /// Latest mark time; fills are stamped with it
    clock: Mutex<Option<DateTime<Utc>>>,
    next_id: AtomicU64,
}

impl PaperGateway {
    pub fn new(config: PaperConfig, accounts: impl IntoIterator<Item = (String, Decimal)>) -> Self {
        Self {
            config,
            accounts: accounts
                .into_iter()
                .map(|(name, balance)| {
                    (
                        name,
                        Mutex::new(PaperAccount {
                            balance,
                            positions: Vec::new(),
                        }),
                    )
                })
                .collect(),
            closed: Mutex::new(Vec::new()),
            clock: Mutex::new(None),
            next_id: AtomicU64::new(1),
        }
    }

    fn account(&self, account: &str) -> Result<&Mutex<PaperAccount>, GatewayError> {
        self.accounts
            .get(account)
            .ok_or_else(|| GatewayError::AccountNotFound(account.to_string()))
    }

    /// Mark every open position on `instrument` and close those whose stop
    /// or target has been reached.
    fn mark_positions(&self, instrument: &str, price: Decimal, at: DateTime<Utc>) {
        {
            let mut clock = self.clock.lock();
            if (*clock).map_or(true, |last| at > last) {
                *clock = Some(at);
            }
        }
        let mut closed = Vec::new();

        for (name, slot) in &self.accounts {
            let mut account = slot.lock();
            for position in account.positions.iter_mut().filter(|p| p.instrument == instrument) {
                position.mark = price;
            }

            let mut index = 0;
            while index < account.positions.len() {
                let trigger = {
                    let position = &account.positions[index];
                    (position.instrument == instrument)
                        .then(|| position.exit_trigger())
                        .flatten()
                };
                match trigger {
                    Some(reason) => {
                        let position = account.close(index);
                        info!(
                            account = %name,
                            client_id = %position.client_id,
                            instrument,
                            exit = %price,
                            reason,
                            "Paper position closed"
                        );
                        closed.push(PositionClosed {
                            client_id: position.client_id,
                            account: name.clone(),
                            instrument: instrument.to_string(),
                            exit_price: price,
                            closed_at: at,
                            reason: reason.to_string(),
                        });
                    }
                    None => index += 1,
                }
            }
        }

        self.closed.lock().extend(closed);
    }

    /// Open positions on an account.
    pub fn open_positions(&self, account: &str) -> usize {
        self.accounts
            .get(account)
            .map_or(0, |slot| slot.lock().positions.len())
    }
}

#[async_trait]
impl OrderGateway for PaperGateway {
    async fn submit(&self, ticket: &OrderTicket) -> Result<Submission, GatewayError> {
        if ticket.units <= Decimal::ZERO {
            return Err(GatewayError::Rejected(format!(
                "non-positive units: {}",
                ticket.units
            )));
        }

        let slippage = self.config.slippage_pips * pip_size(&ticket.instrument);
        let fill_price = ticket.planned_price + ticket.side.sign() * slippage;

        let mut account = self.account(&ticket.account)?.lock();
        let margin = notional(&ticket.instrument, ticket.units, fill_price) / self.config.leverage;
        let available = account.balance - account.margin_used(self.config.leverage);
        if margin > available {
            warn!(
                account = %ticket.account,
                client_id = %ticket.client_id,
                required = %margin,
                available = %available,
                "Paper order rejected"
            );
            return Err(GatewayError::Rejected(format!(
                "insufficient margin: required {}, available {}",
                margin.round_dp(2),
                available.round_dp(2)
            )));
        }

        account.positions.push(PaperPosition {
            client_id: ticket.client_id.clone(),
            instrument: ticket.instrument.clone(),
            side: ticket.side,
            units: ticket.units,
            entry: fill_price,
            stop_loss: ticket.stop_loss,
            take_profit: ticket.take_profit,
            mark: fill_price,
        });

        let trade_id = format!("P-{}", self.next_id.fetch_add(1, Ordering::Relaxed));
        info!(
            account = %ticket.account,
            client_id = %ticket.client_id,
            trade_id = %trade_id,
            instrument = %ticket.instrument,
            side = %ticket.side,
            units = %ticket.units,
            fill_price = %fill_price,
            "Paper order filled"
        );

        Ok(Submission {
            trade_id,
            fill_price,
            filled_at: (*self.clock.lock()).unwrap_or_else(Utc::now),
        })
    }

    async fn request_reduction(&self, request: &ReductionRequest) -> Result<(), GatewayError> {
        let mut account = self.account(&request.account)?.lock();

        let mut losing: Vec<(usize, Decimal)> = account
            .positions
            .iter()
            .enumerate()
            .map(|(i, p)| (i, p.unrealized()))
            .filter(|(_, pnl)| *pnl < Decimal::ZERO)
            .collect();
        if losing.is_empty() {
            return Ok(());
        }

        let count = (Decimal::from(losing.len()) * request.fraction)
            .ceil()
            .to_string()
            .parse::<usize>()
            .unwrap_or(losing.len())
            .min(losing.len());

        // worst first, then close from the highest index so earlier ones stay valid
        losing.sort_by(|a, b| a.1.cmp(&b.1));
        let mut indices: Vec<usize> = losing.iter().take(count).map(|(i, _)| *i).collect();
        indices.sort_unstable_by(|a, b| b.cmp(a));

        let mut closed = Vec::with_capacity(indices.len());
        for index in indices {
            let position = account.close(index);
            closed.push(PositionClosed {
                client_id: position.client_id,
                account: request.account.clone(),
                instrument: position.instrument,
                exit_price: position.mark,
                closed_at: request.issued_at,
                reason: "reduction".to_string(),
            });
        }

        warn!(
            account = %request.account,
            closed = closed.len(),
            fraction = %request.fraction,
            "Paper reduction applied"
        );
        self.closed.lock().extend(closed);
        Ok(())
    }

    async fn mark_price(
        &self,
        instrument: &str,
        price: Decimal,
        at: DateTime<Utc>,
    ) -> Result<Vec<PositionClosed>, GatewayError> {
        self.mark_positions(instrument, price, at);
        Ok(std::mem::take(&mut *self.closed.lock()))
    }

    async fn account_snapshot(&self, account: &str) -> Result<AccountSnapshot, GatewayError> {
        let state = self.account(account)?.lock();
        Ok(AccountSnapshot {
            account: account.to_string(),
            balance: state.balance,
            margin_used: state.margin_used(self.config.leverage),
            open_positions: u32::try_from(state.positions.len()).unwrap_or(u32::MAX),
            unrealized_pnl: state.positions.iter().map(|p| p.unrealized()).sum(),
        })
    }

    fn name(&self) -> &str {
        "paper"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gateway() -> PaperGateway {
        PaperGateway::new(
            PaperConfig {
                slippage_pips: dec!(1),
                leverage: dec!(10),
            },
            [("primary".to_string(), dec!(10000))],
        )
    }

    fn ticket(id: &str, side: Side, units: Decimal) -> OrderTicket {
        let planned = dec!(1.1000);
        OrderTicket {
            client_id: id.to_string(),
            account: "primary".to_string(),
            instrument: "EUR_USD".to_string(),
            side,
            units,
            planned_price: planned,
            stop_loss: planned - side.sign() * dec!(0.0020),
            take_profit: planned + side.sign() * dec!(0.0040),
        }
    }

    #[tokio::test]
    async fn test_fill_with_slippage_and_margin() {
        let gateway = gateway();

        let buy = gateway.submit(&ticket("T-1", Side::Buy, dec!(10000))).await.unwrap();
        assert_eq!(buy.fill_price, dec!(1.1001));
        let sell = gateway.submit(&ticket("T-2", Side::Sell, dec!(10000))).await.unwrap();
        assert_eq!(sell.fill_price, dec!(1.0999));
        assert_ne!(buy.trade_id, sell.trade_id);
        assert!(buy.filled_at <= Utc::now());

        let snapshot = gateway.account_snapshot("primary").await.unwrap();
        assert_eq!(snapshot.open_positions, 2);
        assert_eq!(snapshot.margin_used, dec!(2200));
        assert_eq!(snapshot.margin_usage(), Some(dec!(0.22)));
    }

    #[tokio::test]
    async fn test_rejections() {
        let gateway = gateway();

        let err = gateway
            .submit(&ticket("T-1", Side::Buy, dec!(1000000)))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Rejected(_)));

        let mut unknown = ticket("T-2", Side::Buy, dec!(1000));
        unknown.account = "ghost".to_string();
        assert_eq!(
            gateway.submit(&unknown).await.unwrap_err(),
            GatewayError::AccountNotFound("ghost".to_string())
        );
        assert!(gateway.submit(&ticket("T-3", Side::Buy, Decimal::ZERO)).await.is_err());
    }

    #[tokio::test]
    async fn test_stop_and_target_close_positions() {
        let gateway = gateway();
        let now = Utc::now();
        gateway.submit(&ticket("T-1", Side::Buy, dec!(10000))).await.unwrap();
        gateway.submit(&ticket("T-2", Side::Sell, dec!(10000))).await.unwrap();

        assert!(gateway.mark_price("EUR_USD", dec!(1.1010), now).await.unwrap().is_empty());
        // buy target 1.1040, sell stop 1.1020
        let stopped = gateway.mark_price("EUR_USD", dec!(1.1025), now).await.unwrap();
        assert_eq!(stopped.len(), 1);
        assert_eq!(stopped[0].client_id, "T-2");
        assert_eq!(stopped[0].reason, "stop_loss");

        let later = now + chrono::Duration::minutes(5);
        let target = gateway.mark_price("EUR_USD", dec!(1.1040), later).await.unwrap();
        assert_eq!(target.len(), 1);
        assert_eq!(target[0].reason, "take_profit");
        assert_eq!(target[0].closed_at, later);
        assert!(gateway.mark_price("GBP_USD", dec!(1.27), now).await.unwrap().is_empty());

        let snapshot = gateway.account_snapshot("primary").await.unwrap();
        // sell: (1.0999 - 1.1025) * 10000 = -26, buy: (1.1040 - 1.1001) * 10000 = 39
        assert_eq!(snapshot.balance, dec!(10013));
        assert_eq!(snapshot.open_positions, 0);
    }

    #[tokio::test]
    async fn test_reduction_closes_worst_losers() {
        let gateway = gateway();
        let now = Utc::now();
        gateway.submit(&ticket("T-1", Side::Buy, dec!(10000))).await.unwrap();
        gateway.submit(&ticket("T-2", Side::Buy, dec!(20000))).await.unwrap();
        gateway.submit(&ticket("T-3", Side::Sell, dec!(10000))).await.unwrap();
        gateway.mark_price("EUR_USD", dec!(1.0990), now).await.unwrap();

        gateway
            .request_reduction(&ReductionRequest {
                account: "primary".to_string(),
                fraction: dec!(0.5),
                margin_usage: dec!(0.95),
                issued_at: now,
            })
            .await
            .unwrap();

        let closed = gateway.mark_price("USD_JPY", dec!(150), now).await.unwrap();
        assert_eq!(closed.len(), 1);
        assert_eq!(closed[0].client_id, "T-2");
        assert_eq!(closed[0].reason, "reduction");
        assert_eq!(gateway.open_positions("primary"), 2);
    }
}
