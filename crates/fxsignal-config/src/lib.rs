//! Configuration management.
//!
//! A required TOML file is layered with `FXSIGNAL__`-prefixed environment
//! overrides (e.g. `FXSIGNAL__ENGINE__EVALUATION_INTERVAL_SECS=10`), then
//! validated. Any failure is [`FxError::ConfigInvalid`] and is meant to stop
//! the process at startup.

mod settings;

pub use settings::{
    AccountSettings, AppConfig, AppSettings, EngineSettings, LoggingConfig, PaperSettings,
    RiskSettings, StrategySettings,
};

use config::{Config, Environment, File, FileFormat};
use fxsignal_core::{FxError, FxResult};
use fxsignal_strategies::StrategyRegistry;
use rust_decimal::Decimal;
use std::collections::HashSet;
use std::path::Path;

/// Load configuration from file and environment, then validate it.
pub fn load_config(path: &Path) -> FxResult<AppConfig> {
    let config = Config::builder()
        .add_source(File::from(path).required(true))
        .add_source(
            Environment::with_prefix("FXSIGNAL")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .map_err(invalid)?;

    let app: AppConfig = config.try_deserialize().map_err(invalid)?;
    validate(&app)?;
    Ok(app)
}

/// Parse and validate configuration from a TOML string.
pub fn parse_config(toml: &str) -> FxResult<AppConfig> {
    let app: AppConfig = Config::builder()
        .add_source(File::from_str(toml, FileFormat::Toml))
        .build()
        .and_then(|c| c.try_deserialize())
        .map_err(invalid)?;
    validate(&app)?;
    Ok(app)
}

fn invalid(e: config::ConfigError) -> FxError {
    FxError::ConfigInvalid(e.to_string())
}

fn ensure(condition: bool, message: impl FnOnce() -> String) -> FxResult<()> {
    if condition {
        Ok(())
    } else {
        Err(FxError::ConfigInvalid(message()))
    }
}

/// Semantic checks the deserializer cannot express.
pub fn validate(app: &AppConfig) -> FxResult<()> {
    let engine = &app.engine;
    ensure(engine.evaluation_interval_secs > 0, || {
        "engine.evaluation_interval_secs must be positive".to_string()
    })?;
    ensure(engine.poll_interval_ms > 0, || {
        "engine.poll_interval_ms must be positive".to_string()
    })?;
    ensure(engine.collaborator_timeout_ms > 0, || {
        "engine.collaborator_timeout_ms must be positive".to_string()
    })?;
    ensure(engine.session_offset().is_some(), || {
        format!(
            "engine.session_utc_offset_minutes out of range: {}",
            engine.session_utc_offset_minutes
        )
    })?;
    let lookback = engine.indicators.max_lookback();
    ensure(engine.history_capacity >= lookback, || {
        format!(
            "engine.history_capacity ({}) is below the indicator lookback ({})",
            engine.history_capacity, lookback
        )
    })?;

    let mut window_names = HashSet::new();
    for window in &app.sessions {
        ensure(window.start_hour <= 23 && window.end_hour <= 23, || {
            format!("session '{}' hours must be in 0..=23", window.name)
        })?;
        ensure(window_names.insert(window.name.as_str()), || {
            format!("duplicate session window '{}'", window.name)
        })?;
    }

    validate_risk(app)?;
    ensure(
        app.paper.slippage_pips >= Decimal::ZERO && app.paper.leverage > Decimal::ZERO,
        || "paper slippage must be non-negative and leverage positive".to_string(),
    )?;

    ensure(!app.strategies.is_empty(), || "no strategies configured".to_string())?;
    let registry = StrategyRegistry::new();
    let accounts: HashSet<&str> = app.risk.accounts.iter().map(|a| a.name.as_str()).collect();
    let mut ids = HashSet::new();

    for strategy in &app.strategies {
        let id = strategy.id();
        ensure(ids.insert(id), || format!("duplicate strategy id '{}'", id))?;
        ensure(!strategy.instruments.is_empty(), || {
            format!("strategy '{}' has no instruments", id)
        })?;
        ensure(
            strategy.max_trades_per_day > 0 && strategy.max_daily_quality_trades > 0,
            || format!("strategy '{}' trade caps must be positive", id),
        )?;

        let mut predicates = strategy.predicates();
        predicates.sort_by_key(|p| p.to_string());
        predicates.dedup();
        ensure(strategy.min_confirmations <= predicates.len(), || {
            format!(
                "strategy '{}' requires {} confirmations but only {} predicates are configured",
                id,
                strategy.min_confirmations,
                predicates.len()
            )
        })?;

        for name in &strategy.session_windows {
            ensure(window_names.contains(name.as_str()), || {
                format!("strategy '{}' references unknown session '{}'", id, name)
            })?;
        }
        ensure(accounts.contains(strategy.account.as_str()), || {
            format!("strategy '{}' references unknown account '{}'", id, strategy.account)
        })?;

        let floors = [
            strategy.min_adx,
            strategy.min_momentum,
            strategy.min_volatility,
            strategy.min_atr,
        ];
        ensure(floors.iter().all(|f| f.is_finite() && *f >= 0.0), || {
            format!("strategy '{}' floors must be finite and non-negative", id)
        })?;
        ensure(strategy.min_adx <= 100.0, || {
            format!("strategy '{}' min_adx must not exceed 100", id)
        })?;
        ensure(
            strategy.stop_loss_spec.is_valid() && strategy.take_profit_spec.is_valid(),
            || format!("strategy '{}' stop specs must be positive", id),
        )?;
        ensure(strategy.day_offset().is_some(), || {
            format!("strategy '{}' utc_offset_minutes out of range", id)
        })?;

        registry
            .create(
                &strategy.kind,
                id,
                strategy.registry_params(),
                strategy.instruments.clone(),
            )
            .map_err(|e| FxError::ConfigInvalid(format!("strategy '{}': {}", id, e)))?;
    }

    Ok(())
}

fn validate_risk(app: &AppConfig) -> FxResult<()> {
    let risk = &app.risk;
    let t = &risk.thresholds;

    ensure(t.elevated > 0.0 && t.elevated < t.high, || {
        format!(
            "risk thresholds must satisfy 0 < elevated < high (got {} and {})",
            t.elevated, t.high
        )
    })?;
    ensure(
        t.margin_warning > Decimal::ZERO && t.margin_warning < t.margin_critical,
        || {
            format!(
                "risk margin levels must satisfy 0 < warning < critical (got {} and {})",
                t.margin_warning, t.margin_critical
            )
        },
    )?;
    ensure(t.short_window > 0 && t.short_window <= t.long_window, || {
        "risk detection windows must satisfy 0 < short <= long".to_string()
    })?;
    ensure(
        risk.reduction_fraction > Decimal::ZERO && risk.reduction_fraction <= Decimal::ONE,
        || "risk.reduction_fraction must be in (0, 1]".to_string(),
    )?;
    ensure(
        risk.sizing.risk_per_trade_pct > Decimal::ZERO
            && risk.sizing.min_units > Decimal::ZERO
            && risk.sizing.min_units <= risk.sizing.max_units,
        || "risk.sizing must have positive risk and 0 < min_units <= max_units".to_string(),
    )?;

    ensure(!risk.accounts.is_empty(), || "no accounts configured".to_string())?;
    let mut names = HashSet::new();
    for account in &risk.accounts {
        ensure(names.insert(account.name.as_str()), || {
            format!("duplicate account '{}'", account.name)
        })?;
        ensure(account.initial_balance > Decimal::ZERO, || {
            format!("account '{}' initial_balance must be positive", account.name)
        })?;
        ensure(account.base.position_size_multiplier > Decimal::ZERO, || {
            format!("account '{}' base multiplier must be positive", account.name)
        })?;
    }

    Ok(())
}
