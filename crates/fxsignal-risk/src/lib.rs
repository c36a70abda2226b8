//! Adaptive risk governance and order sizing.
//!
//! - [`ConditionDetector`] classifies each account-instrument pair into a
//!   severity-ordered [`MarketCondition`](fxsignal_core::MarketCondition).
//! - [`AdaptationTable`] maps the condition onto the account's base
//!   [`RiskProfile`](fxsignal_core::RiskProfile).
//! - [`RiskGovernor`] owns per-account state, applies the cooldown and
//!   raises emergency reduction requests.
//! - [`OrderSizer`] turns an approved signal into units, stop and target.

mod adaptation;
mod condition;
mod governor;
mod sizing;
mod stops;

pub use adaptation::{adapt, apply_rule, AccountOverride, AdaptationRule, AdaptationTable};
pub use condition::{ConditionDetector, ConditionInputs, DetectionThresholds};
pub use governor::{AccountEvaluation, AccountRiskConfig, AdaptationOutcome, RiskGovernor};
pub use sizing::{OrderSizer, SizedOrder, SizingConfig};
pub use stops::{stop_price, target_price, StopSpec};
