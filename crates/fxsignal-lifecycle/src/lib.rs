//! Signal and trade lifecycle tracking.
//!
//! The state machines themselves live on [`SignalRecord`](fxsignal_core::SignalRecord)
//! and [`TradeRecord`](fxsignal_core::TradeRecord); this crate owns the
//! records, logs every transition and aggregates closed trades into
//! [`PerformanceStats`].

mod stats;
mod tracker;

pub use stats::PerformanceStats;
pub use tracker::LifecycleTracker;
