//! Error types for the signal pipeline.
//!
//! Expected "not ready yet" situations (short history, stale feed, closed
//! session) are absorbed where they occur and never reach these types as
//! failures of the cycle; the variants below are what gets surfaced.

use thiserror::Error;

/// Top-level pipeline error.
#[derive(Error, Debug)]
pub enum FxError {
    #[error("Invalid configuration: {0}")]
    ConfigInvalid(String),

    #[error("Data error: {0}")]
    Data(#[from] DataError),

    #[error("Indicator error: {0}")]
    Indicator(#[from] IndicatorError),

    #[error("Strategy error: {0}")]
    Strategy(#[from] StrategyError),

    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Lifecycle error: {0}")]
    Lifecycle(#[from] LifecycleError),

    #[error("Condition detection error: {0}")]
    Condition(#[from] ConditionError),

    #[error("Persistence error: {0}")]
    Persistence(#[from] SinkError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Market data errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DataError {
    #[error("Feed unavailable for {instrument}: {reason}")]
    Unavailable { instrument: String, reason: String },

    #[error("Stale price for {instrument}: last update {age_secs}s ago")]
    Stale { instrument: String, age_secs: i64 },

    #[error("Timed out fetching {instrument} after {millis}ms")]
    Timeout { instrument: String, millis: u64 },

    #[error("Parse error: {0}")]
    Parse(String),
}

impl DataError {
    /// Whether the affected instrument should simply be retried next cycle.
    pub fn is_transient(&self) -> bool {
        !matches!(self, DataError::Parse(_))
    }
}

/// Indicator calculation errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IndicatorError {
    #[error("Insufficient history: need {required} samples, have {available}")]
    InsufficientHistory { required: usize, available: usize },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Strategy errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StrategyError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Strategy not found: {0}")]
    NotFound(String),
}

/// Order gateway errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GatewayError {
    #[error("Order rejected: {0}")]
    Rejected(String),

    #[error("Gateway timed out during {operation} after {millis}ms")]
    Timeout { operation: String, millis: u64 },

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Account not found: {0}")]
    AccountNotFound(String),
}

/// Lifecycle misuse. These indicate programming errors and are never ignored.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LifecycleError {
    #[error("Invalid {entity} transition for {id}: {from} -> {to}")]
    InvalidTransition {
        entity: &'static str,
        id: String,
        from: String,
        to: String,
    },

    #[error("Unknown {entity}: {id}")]
    NotFound { entity: &'static str, id: String },
}

/// Unexpected input handed to the risk governor.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConditionError {
    #[error("Non-finite {field} for {account}/{instrument}")]
    NonFinite {
        account: String,
        instrument: String,
        field: &'static str,
    },

    #[error("Negative {field} for {account}/{instrument}: {value}")]
    Negative {
        account: String,
        instrument: String,
        field: &'static str,
        value: String,
    },
}

/// Persistence sink failures.
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("Sink IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Sink serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Sink closed")]
    Closed,
}

/// Result type alias for pipeline operations.
pub type FxResult<T> = Result<T, FxError>;
