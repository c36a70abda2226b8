//! Account state reported by the order gateway.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Point-in-time view of a trading account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountSnapshot {
    /// Account identifier
    pub account: String,
    /// Account balance
    pub balance: Decimal,
    /// Margin currently in use
    pub margin_used: Decimal,
    /// Number of open positions
    pub open_positions: u32,
    /// Unrealized profit/loss across open positions
    pub unrealized_pnl: Decimal,
}

impl AccountSnapshot {
    /// Margin usage as `margin_used / balance`, `None` for a non-positive balance.
    pub fn margin_usage(&self) -> Option<Decimal> {
        if self.balance > Decimal::ZERO {
            Some(self.margin_used / self.balance)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_margin_usage() {
        let mut snapshot = AccountSnapshot {
            account: "primary".to_string(),
            balance: dec!(10000),
            margin_used: dec!(9500),
            open_positions: 3,
            unrealized_pnl: dec!(-120),
        };
        assert_eq!(snapshot.margin_usage(), Some(dec!(0.95)));

        snapshot.balance = Decimal::ZERO;
        assert_eq!(snapshot.margin_usage(), None);
    }
}
