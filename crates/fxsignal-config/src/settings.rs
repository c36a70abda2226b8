//! Configuration structures.

use chrono::{Duration, FixedOffset};
use fxsignal_core::{MarketCondition, RiskProfile};
use fxsignal_gate::{Confirmation, SessionWindow};
use fxsignal_indicators::IndicatorPeriods;
use fxsignal_risk::{AccountOverride, AdaptationRule, DetectionThresholds, SizingConfig, StopSpec};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub app: AppSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub engine: EngineSettings,
    #[serde(default)]
    pub sessions: Vec<SessionWindow>,
    #[serde(default)]
    pub risk: RiskSettings,
    #[serde(default)]
    pub strategies: Vec<StrategySettings>,
    #[serde(default)]
    pub paper: PaperSettings,
}

impl AppConfig {
    /// Adaptation cooldown for an account: the longest cooldown among the
    /// strategies booked against it, or the risk default when none are.
    pub fn account_cooldown(&self, account: &str) -> Duration {
        let seconds = self
            .strategies
            .iter()
            .filter(|s| s.account == account)
            .map(|s| s.adaptation_cooldown_seconds)
            .max()
            .unwrap_or(self.risk.default_cooldown_seconds);
        Duration::seconds(i64::try_from(seconds).unwrap_or(i64::MAX / 1000))
    }

    /// Session windows named by a strategy, in configuration order.
    pub fn windows_for(&self, strategy: &StrategySettings) -> Vec<SessionWindow> {
        self.sessions
            .iter()
            .filter(|w| strategy.session_windows.contains(&w.name))
            .cloned()
            .collect()
    }

    /// All instruments traded by any strategy, sorted and deduplicated.
    pub fn instruments(&self) -> Vec<String> {
        let mut instruments: Vec<String> = self
            .strategies
            .iter()
            .flat_map(|s| s.instruments.iter().cloned())
            .collect();
        instruments.sort();
        instruments.dedup();
        instruments
    }

    /// Instruments traded through `account`, sorted and deduplicated.
    pub fn account_instruments(&self, account: &str) -> Vec<String> {
        let mut instruments: Vec<String> = self
            .strategies
            .iter()
            .filter(|s| s.account == account)
            .flat_map(|s| s.instruments.iter().cloned())
            .collect();
        instruments.sort();
        instruments.dedup();
        instruments
    }
}

/// General app settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    pub name: String,
    pub environment: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            name: "fxsignal".to_string(),
            environment: "development".to_string(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    /// `pretty` or `json`
    pub format: String,
    /// Directory for a daily-rolling log file
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            file: None,
        }
    }
}

/// Scheduling, collaborator timeouts and history settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Seconds between governance cycles
    pub evaluation_interval_secs: u64,
    /// Milliseconds between market data polls
    pub poll_interval_ms: u64,
    /// Timeout for every market data, gateway and oracle call
    pub collaborator_timeout_ms: u64,
    /// Samples kept per instrument
    pub history_capacity: usize,
    /// Offset of the reference timezone session windows are defined in
    pub session_utc_offset_minutes: i32,
    pub indicators: IndicatorPeriods,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            evaluation_interval_secs: 30,
            poll_interval_ms: 1000,
            collaborator_timeout_ms: 2000,
            history_capacity: 200,
            session_utc_offset_minutes: 0,
            indicators: IndicatorPeriods::default(),
        }
    }
}

impl EngineSettings {
    /// Reference timezone for session windows.
    pub fn session_offset(&self) -> Option<FixedOffset> {
        offset_from_minutes(self.session_utc_offset_minutes)
    }

    pub fn collaborator_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.collaborator_timeout_ms)
    }

    pub fn evaluation_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.evaluation_interval_secs)
    }

    pub fn poll_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.poll_interval_ms)
    }
}

/// Risk governance settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskSettings {
    pub thresholds: DetectionThresholds,
    /// Fraction of losing exposure closed on a critical margin reading
    pub reduction_fraction: Decimal,
    /// Cooldown for accounts no strategy names
    pub default_cooldown_seconds: u64,
    pub sizing: SizingConfig,
    /// Entries replacing the default adaptation table
    pub adaptation: BTreeMap<MarketCondition, AdaptationRule>,
    pub accounts: Vec<AccountSettings>,
}

impl Default for RiskSettings {
    fn default() -> Self {
        Self {
            thresholds: DetectionThresholds::default(),
            reduction_fraction: dec!(0.5),
            default_cooldown_seconds: 300,
            sizing: SizingConfig::default(),
            adaptation: BTreeMap::new(),
            accounts: vec![AccountSettings::default()],
        }
    }
}

/// Simulated fills for paper runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaperSettings {
    pub slippage_pips: Decimal,
    pub leverage: Decimal,
}

impl Default for PaperSettings {
    fn default() -> Self {
        Self {
            slippage_pips: dec!(0.5),
            leverage: dec!(30),
        }
    }
}

/// One trading account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountSettings {
    pub name: String,
    /// Balance the paper gateway starts from
    #[serde(default = "default_balance")]
    pub initial_balance: Decimal,
    #[serde(default)]
    pub base: RiskProfile,
    #[serde(default)]
    pub overrides: Vec<AccountOverride>,
}

impl Default for AccountSettings {
    fn default() -> Self {
        Self {
            name: default_account(),
            initial_balance: default_balance(),
            base: RiskProfile::default(),
            overrides: vec![],
        }
    }
}

/// Per-strategy settings.
///
/// The fields without a serde default are required; a strategy table that
/// omits one fails to load. Unknown keys are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategySettings {
    pub instruments: Vec<String>,
    pub max_trades_per_day: u32,
    pub max_daily_quality_trades: u32,
    pub min_confirmations: usize,
    pub session_windows: Vec<String>,
    pub min_spacing_minutes: u32,
    pub min_adx: f64,
    pub min_momentum: f64,
    pub min_volatility: f64,
    pub stop_loss_spec: StopSpec,
    pub take_profit_spec: StopSpec,
    pub adaptation_cooldown_seconds: u64,

    /// Strategy id, defaults to the kind
    #[serde(default)]
    pub name: Option<String>,
    /// Registry name of the rule set
    #[serde(default = "default_kind")]
    pub kind: String,
    #[serde(default = "default_account")]
    pub account: String,
    /// Rule-set specific parameters
    #[serde(default)]
    pub params: serde_json::Value,
    #[serde(default = "default_true")]
    pub restrict_to_sessions: bool,
    /// Timezone the strategy's trading day is counted in
    #[serde(default)]
    pub utc_offset_minutes: i32,
    #[serde(default)]
    pub min_atr: f64,
    #[serde(default = "default_expiry")]
    pub signal_expiry_minutes: u32,
    /// Confirmation predicates, all of them when absent
    #[serde(default)]
    pub confirmations: Option<Vec<Confirmation>>,
}

impl StrategySettings {
    pub fn id(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.kind)
    }

    pub fn predicates(&self) -> Vec<Confirmation> {
        self.confirmations
            .clone()
            .unwrap_or_else(|| Confirmation::ALL.to_vec())
    }

    /// Registry parameters with `min_adx` and `min_momentum` filled in
    /// unless `params` sets them itself.
    pub fn registry_params(&self) -> serde_json::Value {
        let mut params = match &self.params {
            serde_json::Value::Object(map) => map.clone(),
            _ => serde_json::Map::new(),
        };
        params
            .entry("min_adx")
            .or_insert_with(|| serde_json::json!(self.min_adx));
        params
            .entry("min_momentum")
            .or_insert_with(|| serde_json::json!(self.min_momentum));
        serde_json::Value::Object(params)
    }

    /// Timezone for the daily book.
    pub fn day_offset(&self) -> Option<FixedOffset> {
        offset_from_minutes(self.utc_offset_minutes)
    }

    pub fn min_spacing(&self) -> Duration {
        Duration::minutes(i64::from(self.min_spacing_minutes))
    }

    pub fn signal_expiry(&self) -> Duration {
        Duration::minutes(i64::from(self.signal_expiry_minutes))
    }
}

fn offset_from_minutes(minutes: i32) -> Option<FixedOffset> {
    minutes
        .checked_mul(60)
        .and_then(FixedOffset::east_opt)
}

fn default_kind() -> String {
    "ema_trend".to_string()
}

fn default_account() -> String {
    "primary".to_string()
}

fn default_balance() -> Decimal {
    dec!(10000)
}

fn default_true() -> bool {
    true
}

fn default_expiry() -> u32 {
    30
}
