//! Strategy registry for config-driven strategy construction.

use crate::{
    AdxMomentumConfig, AdxMomentumStrategy, EmaTrendConfig, EmaTrendStrategy,
    SessionBreakoutConfig, SessionBreakoutStrategy,
};
use fxsignal_core::{error::StrategyError, traits::Strategy, traits::StrategyConfig};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Information about a registered strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyInfo {
    /// Registry key
    pub kind: String,
    /// Human-readable name
    pub name: String,
    /// Strategy description
    pub description: String,
    /// Default configuration as JSON
    pub default_config: serde_json::Value,
}

/// Registry of the built-in rule sets.
pub struct StrategyRegistry {
    strategies: BTreeMap<String, StrategyInfo>,
}

impl StrategyRegistry {
    /// Create a new registry with all built-in strategies.
    pub fn new() -> Self {
        let mut registry = Self {
            strategies: BTreeMap::new(),
        };

        registry.register(
            "ema_trend",
            "EMA Trend",
            "Trades in the direction of stacked fast/mid/slow EMAs",
            serde_json::to_value(EmaTrendConfig::default()),
        );
        registry.register(
            "session_breakout",
            "Session Breakout",
            "Trades range breakouts confirmed by the EMA stack",
            serde_json::to_value(SessionBreakoutConfig::default()),
        );
        registry.register(
            "adx_momentum",
            "ADX Momentum",
            "Follows momentum when the ADX approximation shows a trending market",
            serde_json::to_value(AdxMomentumConfig::default()),
        );

        registry
    }

    fn register(
        &mut self,
        kind: &str,
        name: &str,
        description: &str,
        default_config: serde_json::Result<serde_json::Value>,
    ) {
        self.strategies.insert(
            kind.to_string(),
            StrategyInfo {
                kind: kind.to_string(),
                name: name.to_string(),
                description: description.to_string(),
                default_config: default_config.unwrap_or_default(),
            },
        );
    }

    /// List all available strategies, ordered by kind.
    pub fn list(&self) -> Vec<&StrategyInfo> {
        self.strategies.values().collect()
    }

    /// Get strategy info by kind.
    pub fn get(&self, kind: &str) -> Option<&StrategyInfo> {
        self.strategies.get(kind)
    }

    /// Check if a strategy kind exists.
    pub fn exists(&self, kind: &str) -> bool {
        self.strategies.contains_key(kind)
    }

    /// Get all strategy kinds.
    pub fn kinds(&self) -> Vec<&str> {
        self.strategies.keys().map(String::as_str).collect()
    }

    /// Create a strategy instance.
    ///
    /// `params` may be `null` or a partial object; missing fields take their
    /// defaults and unknown fields are ignored. `instruments` always replaces
    /// whatever `params` carries.
    pub fn create(
        &self,
        kind: &str,
        id: &str,
        params: serde_json::Value,
        instruments: Vec<String>,
    ) -> Result<Box<dyn Strategy>, StrategyError> {
        match kind {
            "ema_trend" => {
                let mut config: EmaTrendConfig = parse_config(params)?;
                config.instruments = instruments;
                config.validate()?;
                Ok(Box::new(EmaTrendStrategy::new(id, config)))
            }
            "session_breakout" => {
                let mut config: SessionBreakoutConfig = parse_config(params)?;
                config.instruments = instruments;
                config.validate()?;
                Ok(Box::new(SessionBreakoutStrategy::new(id, config)))
            }
            "adx_momentum" => {
                let mut config: AdxMomentumConfig = parse_config(params)?;
                config.instruments = instruments;
                config.validate()?;
                Ok(Box::new(AdxMomentumStrategy::new(id, config)))
            }
            _ => Err(StrategyError::NotFound(kind.to_string())),
        }
    }

    /// Create a strategy with default configuration.
    pub fn create_default(
        &self,
        kind: &str,
        instruments: Vec<String>,
    ) -> Result<Box<dyn Strategy>, StrategyError> {
        let info = self
            .get(kind)
            .ok_or_else(|| StrategyError::NotFound(kind.to_string()))?;
        self.create(kind, kind, info.default_config.clone(), instruments)
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_config<T: DeserializeOwned + Default>(
    params: serde_json::Value,
) -> Result<T, StrategyError> {
    if params.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(params).map_err(|e| StrategyError::InvalidConfig(e.to_string()))
}
