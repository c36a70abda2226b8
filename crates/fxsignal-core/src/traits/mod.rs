//! Core traits for the signal pipeline.

mod gateway;
mod indicator;
mod market_data;
mod oracle;
mod sink;
mod strategy;

pub use gateway::OrderGateway;
pub use indicator::Indicator;
pub use market_data::MarketDataProvider;
pub use oracle::{NewsOracle, NoopOracle};
pub use sink::{AdaptationEntry, PersistenceSink, SinkEntry};
pub use strategy::{EvaluationContext, Strategy, StrategyConfig};
