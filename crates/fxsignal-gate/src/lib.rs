//! Quality gate, daily ranking and session/spacing filter.
//!
//! Candidates flow through here in three steps: confirmation counting
//! ([`QualityGate`]), accumulation into the strategy's [`DailyBook`], and
//! rank-ordered approval through the [`SessionFilter`]. All per-strategy
//! state sits behind one lock per strategy in [`StrategyGates`].

pub mod confirm;
pub mod daily;
pub mod gate;
pub mod session;

pub use confirm::{Confirmation, ConfirmationContext, QualityGate, QualityThresholds};
pub use daily::{DailyBook, DailyBookSummary};
pub use gate::{StrategyGate, StrategyGates};
pub use session::{external_pause, Rejection, SessionFilter, SessionWindow};
