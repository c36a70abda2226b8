//! Indicator engine for the signal pipeline.
//!
//! This crate owns the per-instrument price history and the indicator math
//! consumed by strategies, the quality gate and the risk governor:
//! - Rolling history with bounded capacity and cycle snapshots
//! - Moving averages (EMA, SMA)
//! - Momentum and an ADX approximation
//! - Volatility (ATR from consecutive differences, coefficient of variation)
//!
//! Every function here is pure over a history slice (oldest first). Short
//! histories yield the documented fallback value, never an error.

pub mod engine;
pub mod history;
pub mod momentum;
pub mod moving_average;
pub mod simd;
pub mod snapshot;
pub mod volatility;

pub use engine::{HistorySnapshot, IndicatorEngine};
pub use history::RollingHistory;
pub use momentum::{adx_approx, momentum, AdxApprox, Momentum};
pub use moving_average::{ema, sma, Ema, Sma};
pub use snapshot::{IndicatorPeriods, IndicatorSnapshot};
pub use volatility::{atr, stdev, volatility, Atr, Volatility};
