//! Core data types for the signal pipeline.

mod account;
mod condition;
mod order;
mod price;
mod risk_profile;
mod signal;
mod trade;

pub use account::AccountSnapshot;
pub use condition::MarketCondition;
pub use order::{OrderTicket, PositionClosed, ReductionRequest, Side, Submission};
pub use price::{pip_size, pip_size_f64, to_pips, PriceSample};
pub use risk_profile::{RiskProfile, TradeFrequency};
pub use signal::{ApprovedSignal, CandidateSignal, RationaleTag, SignalRecord, SignalState};
pub use trade::{TradeRecord, TradeState};
