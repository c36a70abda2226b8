//! Aggregate performance over closed trades.

use fxsignal_core::{TradeRecord, TradeState};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Performance statistics over closed trades.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceStats {
    /// Closed trades counted
    pub total_trades: usize,
    /// Trades with positive P&L
    pub winning_trades: usize,
    /// Trades with negative P&L
    pub losing_trades: usize,
    /// Win rate percentage
    pub win_rate_pct: Decimal,
    /// Sum of realized pips
    pub total_pips: Decimal,
    /// Sum of realized P&L
    pub total_profit_loss: Decimal,
    /// Average profit per winning trade
    pub avg_win: Decimal,
    /// Average loss per losing trade (positive)
    pub avg_loss: Decimal,
    /// Gross profit / gross loss, zero without losses
    pub profit_factor: Decimal,
    /// Largest peak-to-trough fall of the cumulative P&L curve
    pub max_drawdown: Decimal,
    /// Worst adverse excursion seen on any trade, in pips
    pub max_adverse_pips: Option<Decimal>,
}

impl PerformanceStats {
    /// Compute statistics from trade records. Only `Closed` trades count;
    /// the P&L curve is built in close-time order.
    pub fn from_trades<'a>(trades: impl IntoIterator<Item = &'a TradeRecord>) -> Self {
        let mut closed: Vec<&TradeRecord> = trades
            .into_iter()
            .filter(|t| t.state == TradeState::Closed)
            .collect();
        closed.sort_by_key(|t| t.closed_at);

        let mut stats = Self::default();
        let mut gross_profit = Decimal::ZERO;
        let mut gross_loss = Decimal::ZERO;
        let mut equity = Decimal::ZERO;
        let mut peak = Decimal::ZERO;

        for trade in &closed {
            let pnl = trade.profit_loss.unwrap_or_default();
            stats.total_trades += 1;
            stats.total_pips += trade.pips.unwrap_or_default();
            stats.total_profit_loss += pnl;

            if pnl > Decimal::ZERO {
                stats.winning_trades += 1;
                gross_profit += pnl;
            } else if pnl < Decimal::ZERO {
                stats.losing_trades += 1;
                gross_loss += pnl.abs();
            }

            equity += pnl;
            peak = peak.max(equity);
            stats.max_drawdown = stats.max_drawdown.max(peak - equity);

            if let Some(adverse) = trade.max_adverse_pips {
                stats.max_adverse_pips = Some(stats.max_adverse_pips.map_or(adverse, |m| m.max(adverse)));
            }
        }

        if stats.total_trades > 0 {
            stats.win_rate_pct =
                Decimal::from(stats.winning_trades * 100) / Decimal::from(stats.total_trades);
        }
        if stats.winning_trades > 0 {
            stats.avg_win = gross_profit / Decimal::from(stats.winning_trades);
        }
        if stats.losing_trades > 0 {
            stats.avg_loss = gross_loss / Decimal::from(stats.losing_trades);
        }
        if gross_loss > Decimal::ZERO {
            stats.profit_factor = gross_profit / gross_loss;
        }

        stats
    }

    /// Text summary for the CLI.
    pub fn summary(&self) -> String {
        let mut s = String::new();

        s.push_str("TRADE STATISTICS\n");
        s.push_str("───────────────────────────────────────────────────────────\n");
        s.push_str(&format!("  Closed Trades:       {}\n", self.total_trades));
        s.push_str(&format!("  Winning Trades:      {}\n", self.winning_trades));
        s.push_str(&format!("  Losing Trades:       {}\n", self.losing_trades));
        s.push_str(&format!("  Win Rate:            {:.2}%\n", self.win_rate_pct));
        s.push_str(&format!("  Total Pips:          {:.1}\n", self.total_pips));
        s.push_str(&format!("  Total P&L:           {:.2}\n", self.total_profit_loss));
        s.push_str(&format!("  Avg Win:             {:.2}\n", self.avg_win));
        s.push_str(&format!("  Avg Loss:            {:.2}\n", self.avg_loss));
        s.push_str(&format!("  Profit Factor:       {:.2}\n", self.profit_factor));
        s.push_str(&format!("  Max Drawdown:        {:.2}\n", self.max_drawdown));
        if let Some(adverse) = self.max_adverse_pips {
            s.push_str(&format!("  Max Adverse Pips:    {:.1}\n", adverse));
        }

        s
    }
}
