//! Rule-based signal strategies.
//!
//! Three built-in rule sets, all pure over a price history snapshot:
//! - EMA trend (stacked fast/mid/slow EMAs)
//! - Session breakout (range breakout gated by trend agreement)
//! - ADX momentum (momentum filtered by trend strength)

mod adx_momentum;
mod ema_trend;
mod registry;
pub mod rules;
mod session_breakout;

pub use adx_momentum::{AdxMomentumConfig, AdxMomentumStrategy};
pub use ema_trend::{EmaTrendConfig, EmaTrendStrategy};
pub use registry::{StrategyInfo, StrategyRegistry};
pub use rules::{TrendParams, TrendReading};
pub use session_breakout::{SessionBreakoutConfig, SessionBreakoutStrategy};
