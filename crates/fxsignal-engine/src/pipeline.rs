//! Single-cycle evaluation pipeline.
//!
//! One governance cycle runs, in order: history snapshot, oracle reads,
//! per-account condition detection and adaptation, emergency reductions,
//! per-strategy rule evaluation, confirmation and accumulation, ranked
//! approval, order sizing, submission and lifecycle recording.
//!
//! The pipeline never holds a lock across a collaborator call and wraps
//! every such call in a timeout. A slow or failing collaborator only costs
//! the affected instrument or account its turn this cycle.

use crate::report::{CycleReport, IngestReport};
use chrono::{DateTime, Duration, Utc};
use fxsignal_config::AppConfig;
use fxsignal_core::error::{GatewayError, LifecycleError};
use fxsignal_core::{
    AccountSnapshot, ApprovedSignal, EvaluationContext, FxError, FxResult, MarketDataProvider,
    NewsOracle, OrderGateway, OrderTicket, PersistenceSink, PriceSample, SinkEntry, Strategy,
};
use fxsignal_gate::{
    external_pause, DailyBook, QualityGate, QualityThresholds, SessionFilter, StrategyGate,
    StrategyGates,
};
use fxsignal_indicators::{IndicatorEngine, IndicatorPeriods, IndicatorSnapshot};
use fxsignal_lifecycle::LifecycleTracker;
use fxsignal_risk::{
    AccountRiskConfig, AdaptationOutcome, AdaptationTable, ConditionDetector, ConditionInputs,
    OrderSizer, RiskGovernor, StopSpec,
};
use fxsignal_strategies::StrategyRegistry;
use futures::future::join_all;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration as StdDuration;
use tokio::time::timeout;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// External collaborators injected at construction.
#[derive(Clone)]
pub struct Collaborators {
    pub market_data: Arc<dyn MarketDataProvider>,
    pub gateway: Arc<dyn OrderGateway>,
    pub oracle: Arc<dyn NewsOracle>,
    pub sink: Arc<dyn PersistenceSink>,
}

struct StrategySlot {
    strategy: Box<dyn Strategy>,
    account: String,
    stop_loss: StopSpec,
    take_profit: StopSpec,
}

/// Everything one cycle knows about an instrument, read once at cycle start.
struct InstrumentView {
    latest: PriceSample,
    mids: Vec<f64>,
    indicators: IndicatorSnapshot,
    sentiment: f64,
    paused: bool,
}

/// The signal pipeline and the state it owns.
pub struct Pipeline {
    indicators: IndicatorEngine,
    periods: IndicatorPeriods,
    strategies: Vec<StrategySlot>,
    gates: StrategyGates,
    governor: RiskGovernor,
    sizer: OrderSizer,
    tracker: LifecycleTracker,
    collaborators: Collaborators,
    timeout: StdDuration,
    instruments: Vec<String>,
    account_instruments: Vec<(String, Vec<String>)>,
    signal_expiry: Duration,
}

impl Pipeline {
    /// Build a pipeline from validated configuration.
    pub fn from_config(app: &AppConfig, collaborators: Collaborators) -> FxResult<Self> {
        let registry = StrategyRegistry::new();
        let session_offset = app.engine.session_offset().ok_or_else(|| {
            FxError::ConfigInvalid("engine.session_utc_offset_minutes out of range".to_string())
        })?;

        let mut strategies = Vec::with_capacity(app.strategies.len());
        let mut gates = Vec::with_capacity(app.strategies.len());
        let mut signal_expiry = Duration::zero();

        for settings in &app.strategies {
            let id = settings.id();
            let strategy = registry.create(
                &settings.kind,
                id,
                settings.registry_params(),
                settings.instruments.clone(),
            )?;
            let day_offset = settings.day_offset().ok_or_else(|| {
                FxError::ConfigInvalid(format!("strategy '{}' utc_offset_minutes out of range", id))
            })?;

            let quality = QualityGate::new(
                settings.predicates(),
                settings.min_confirmations,
                QualityThresholds {
                    min_volatility: settings.min_volatility,
                    min_atr: settings.min_atr,
                    ..Default::default()
                },
            );
            let book = DailyBook::new(
                id,
                day_offset,
                settings.max_daily_quality_trades as usize,
                settings.max_trades_per_day as usize,
            );
            let sessions = SessionFilter::new(
                app.windows_for(settings),
                session_offset,
                settings.restrict_to_sessions,
                settings.min_spacing(),
            );
            gates.push((
                id.to_string(),
                StrategyGate::new(quality, book, sessions, settings.signal_expiry()),
            ));

            signal_expiry = signal_expiry.max(settings.signal_expiry());
            strategies.push(StrategySlot {
                strategy,
                account: settings.account.clone(),
                stop_loss: settings.stop_loss_spec.clone(),
                take_profit: settings.take_profit_spec.clone(),
            });
        }

        let accounts = app.risk.accounts.iter().map(|account| {
            (
                account.name.clone(),
                AccountRiskConfig {
                    base: account.base.clone(),
                    overrides: account.overrides.clone(),
                    cooldown: app.account_cooldown(&account.name),
                },
            )
        });
        let governor = RiskGovernor::new(
            ConditionDetector::new(app.risk.thresholds.clone()),
            AdaptationTable::with_overrides(app.risk.adaptation.clone()),
            app.risk.reduction_fraction,
            accounts,
        );

        let account_instruments = app
            .risk
            .accounts
            .iter()
            .map(|a| (a.name.clone(), app.account_instruments(&a.name)))
            .collect();

        let pipeline = Self {
            indicators: IndicatorEngine::new(app.engine.history_capacity),
            periods: app.engine.indicators,
            strategies,
            gates: StrategyGates::new(gates),
            governor,
            sizer: OrderSizer::new(app.risk.sizing.clone()),
            tracker: LifecycleTracker::new(),
            collaborators,
            timeout: app.engine.collaborator_timeout(),
            instruments: app.instruments(),
            account_instruments,
            signal_expiry,
        };

        info!(
            strategies = pipeline.strategies.len(),
            instruments = pipeline.instruments.len(),
            accounts = pipeline.account_instruments.len(),
            market_data = pipeline.collaborators.market_data.name(),
            gateway = pipeline.collaborators.gateway.name(),
            oracle = pipeline.collaborators.oracle.name(),
            sink = pipeline.collaborators.sink.name(),
            "Pipeline ready"
        );
        Ok(pipeline)
    }

    pub fn tracker(&self) -> &LifecycleTracker {
        &self.tracker
    }

    pub fn governor(&self) -> &RiskGovernor {
        &self.governor
    }

    pub fn gates(&self) -> &StrategyGates {
        &self.gates
    }

    pub fn indicators(&self) -> &IndicatorEngine {
        &self.indicators
    }

    /// Tracked instruments, sorted.
    pub fn instruments(&self) -> &[String] {
        &self.instruments
    }

    fn timeout_ms(&self) -> u64 {
        u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX)
    }

    /// Poll one price per tracked instrument and feed it to the history.
    ///
    /// Each stored price also marks open trades, and positions the gateway
    /// reports closed are recorded in the lifecycle tracker.
    pub async fn poll_prices(&self) -> FxResult<IngestReport> {
        let provider = &self.collaborators.market_data;
        let mut report = IngestReport::default();

        for instrument in &self.instruments {
            report.polled += 1;

            let sample = match timeout(self.timeout, provider.get_price(instrument)).await {
                Ok(Ok(sample)) => sample,
                Ok(Err(e)) if e.is_transient() => {
                    debug!(instrument = %instrument, error = %e, "Price unavailable, skipping");
                    report.skipped += 1;
                    continue;
                }
                Ok(Err(e)) => {
                    warn!(instrument = %instrument, error = %e, "Bad price from provider, skipping");
                    report.skipped += 1;
                    continue;
                }
                Err(_) => {
                    warn!(
                        instrument = %instrument,
                        provider = provider.name(),
                        timeout_ms = self.timeout_ms(),
                        "Price request timed out, skipping"
                    );
                    report.skipped += 1;
                    continue;
                }
            };

            let at = sample.timestamp;
            let mid = Decimal::try_from(sample.mid).ok();
            if !self.indicators.ingest(sample) {
                report.skipped += 1;
                continue;
            }
            report.ingested += 1;
            report.latest = report.latest.max(Some(at));

            if let Some(price) = mid {
                report.closed += self.mark(instrument, price, at).await?;
            }
        }

        Ok(report)
    }

    async fn mark(&self, instrument: &str, price: Decimal, at: DateTime<Utc>) -> FxResult<usize> {
        self.tracker.mark_price(instrument, price);

        let gateway = &self.collaborators.gateway;
        let closed = match timeout(self.timeout, gateway.mark_price(instrument, price, at)).await {
            Ok(Ok(closed)) => closed,
            Ok(Err(e)) => {
                warn!(instrument, error = %e, "Gateway mark failed");
                return Ok(0);
            }
            Err(_) => {
                warn!(
                    instrument,
                    gateway = gateway.name(),
                    timeout_ms = self.timeout_ms(),
                    "Gateway mark timed out"
                );
                return Ok(0);
            }
        };

        let mut recorded = 0;
        for position in closed {
            match self
                .tracker
                .close_trade(&position.client_id, position.exit_price, position.closed_at)
            {
                Ok(trade) => {
                    info!(
                        trade_id = %trade.trade_id,
                        instrument = %trade.instrument,
                        reason = %position.reason,
                        pips = ?trade.pips,
                        profit_loss = ?trade.profit_loss,
                        "Trade closed"
                    );
                    self.journal(SinkEntry::Trade(trade)).await;
                    recorded += 1;
                }
                Err(LifecycleError::NotFound { .. }) => {
                    warn!(
                        client_id = %position.client_id,
                        account = %position.account,
                        "Gateway closed an untracked position"
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(recorded)
    }

    /// Run one governance cycle at `now`.
    ///
    /// Every instrument is evaluated against the history snapshot taken at
    /// the start of the cycle. Lifecycle misuse is returned as an error;
    /// collaborator failures are logged and skipped.
    pub async fn evaluate_cycle(&self, now: DateTime<Utc>) -> FxResult<CycleReport> {
        let mut report = CycleReport::new(now);
        let snapshot = self.indicators.snapshot(&self.instruments, now);
        report.instruments_evaluated = snapshot.len();
        report.instruments_skipped = self.instruments.len().saturating_sub(snapshot.len());

        // Oracle reads for all instruments run concurrently, each under its own timeout
        let reads = join_all(
            self.instruments
                .iter()
                .filter(|instrument| snapshot.contains(instrument))
                .map(|instrument| async move {
                    let scope = std::slice::from_ref(instrument);
                    let oracle = self.collaborators.oracle.as_ref();
                    let paused = external_pause(oracle, scope, self.timeout).await;
                    (instrument, paused, self.sentiment(scope).await)
                }),
        )
        .await;

        let mut views: HashMap<&str, InstrumentView> = HashMap::with_capacity(reads.len());
        for (instrument, paused, sentiment) in reads {
            let Some(latest) = snapshot.latest(instrument) else {
                continue;
            };
            let mids = snapshot.mids(instrument);
            let indicators = IndicatorSnapshot::compute(&mids, &self.periods);

            views.insert(
                instrument.as_str(),
                InstrumentView {
                    latest: latest.clone(),
                    mids,
                    indicators,
                    sentiment,
                    paused,
                },
            );
        }

        let mut accounts = self.govern(&views, now, &mut report).await;

        for slot in &self.strategies {
            self.run_strategy(slot, &views, &mut accounts, now, &mut report)
                .await?;
        }

        for record in self.tracker.expire_stale(now, self.signal_expiry) {
            report.expired += 1;
            self.journal(SinkEntry::Signal(record)).await;
        }

        report.condition = self.governor.current_condition();
        info!(
            candidates = report.candidates,
            admitted = report.admitted,
            approved = report.approved,
            filled = report.filled,
            rejected = report.rejected,
            condition = %report.condition,
            "Cycle complete"
        );
        Ok(report)
    }

    async fn sentiment(&self, instruments: &[String]) -> f64 {
        let oracle = &self.collaborators.oracle;
        match timeout(self.timeout, oracle.sentiment(instruments)).await {
            Ok(Ok(value)) if value.is_finite() => value.clamp(-1.0, 1.0),
            Ok(Ok(value)) => {
                warn!(oracle = oracle.name(), value, "Non-finite sentiment, using neutral");
                0.0
            }
            Ok(Err(e)) => {
                warn!(oracle = oracle.name(), error = %e, "Sentiment failed, using neutral");
                0.0
            }
            Err(_) => {
                warn!(
                    oracle = oracle.name(),
                    timeout_ms = self.timeout_ms(),
                    "Sentiment timed out, using neutral"
                );
                0.0
            }
        }
    }

    /// Detect conditions and adapt every account; returns the snapshots of
    /// the accounts that answered.
    async fn govern(
        &self,
        views: &HashMap<&str, InstrumentView>,
        now: DateTime<Utc>,
        report: &mut CycleReport,
    ) -> HashMap<String, AccountSnapshot> {
        let gateway = &self.collaborators.gateway;
        let thresholds = self.governor.detector().thresholds();
        let mut snapshots = HashMap::with_capacity(self.account_instruments.len());

        for (account, instruments) in &self.account_instruments {
            let snapshot = match timeout(self.timeout, gateway.account_snapshot(account)).await {
                Ok(Ok(snapshot)) => snapshot,
                Ok(Err(e)) => {
                    warn!(account = %account, error = %e, "Account snapshot failed, skipping account");
                    report.accounts_skipped += 1;
                    continue;
                }
                Err(_) => {
                    warn!(
                        account = %account,
                        timeout_ms = self.timeout_ms(),
                        "Account snapshot timed out, skipping account"
                    );
                    report.accounts_skipped += 1;
                    continue;
                }
            };

            let inputs: Vec<ConditionInputs> = instruments
                .iter()
                .filter_map(|instrument| {
                    views.get(instrument.as_str()).map(|view| {
                        ConditionInputs::from_prices(account, instrument, &view.mids, thresholds)
                            .with_central_bank(view.paused)
                    })
                })
                .collect();

            let Some(evaluation) =
                self.governor
                    .evaluate(account, &inputs, snapshot.margin_usage(), now)
            else {
                continue;
            };
            report.accounts_evaluated += 1;
            if evaluation.outcome == AdaptationOutcome::Adapted {
                report.adaptations += 1;
            }
            if let Some(entry) = evaluation.to_entry(now) {
                self.journal(SinkEntry::Adaptation(entry)).await;
            }

            if let Some(request) = evaluation.reduction {
                report.reductions += 1;
                match timeout(self.timeout, gateway.request_reduction(&request)).await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => {
                        warn!(account = %account, error = %e, "Reduction request failed")
                    }
                    Err(_) => warn!(
                        account = %account,
                        timeout_ms = self.timeout_ms(),
                        "Reduction request timed out"
                    ),
                }
            }

            snapshots.insert(account.clone(), snapshot);
        }

        snapshots
    }

    async fn run_strategy(
        &self,
        slot: &StrategySlot,
        views: &HashMap<&str, InstrumentView>,
        accounts: &mut HashMap<String, AccountSnapshot>,
        now: DateTime<Utc>,
        report: &mut CycleReport,
    ) -> FxResult<()> {
        let id = slot.strategy.id();
        let mut paused = false;

        for instrument in slot.strategy.instruments() {
            let Some(view) = views.get(instrument.as_str()) else {
                continue;
            };
            paused |= view.paused;

            if !slot.strategy.is_warmed_up(view.mids.len()) {
                debug!(
                    strategy = id,
                    instrument = %instrument,
                    samples = view.mids.len(),
                    required = slot.strategy.warmup_period(),
                    "Strategy warming up"
                );
                continue;
            }

            let ctx = EvaluationContext {
                instrument,
                prices: &view.mids,
                latest: &view.latest,
                sentiment: view.sentiment,
                now,
            };
            let candidates = slot.strategy.evaluate(&ctx);
            report.candidates += candidates.len();

            report.admitted += self
                .gates
                .with_gate(id, |gate| {
                    candidates
                        .into_iter()
                        .filter(|candidate| {
                            gate.offer(candidate.clone(), &view.mids, &view.indicators, now)
                        })
                        .count()
                })
                .unwrap_or_default();
        }

        let profile_paused = self
            .governor
            .profile(&slot.account)
            .is_some_and(|profile| profile.is_paused());
        let approved = self
            .gates
            .with_gate(id, |gate| gate.approve(now, paused || profile_paused))
            .unwrap_or_default();
        report.approved += approved.len();

        for signal in approved {
            self.dispatch(slot, signal, views, accounts, now, report)
                .await?;
        }
        Ok(())
    }

    /// Size, submit and record one approved signal.
    async fn dispatch(
        &self,
        slot: &StrategySlot,
        signal: ApprovedSignal,
        views: &HashMap<&str, InstrumentView>,
        accounts: &mut HashMap<String, AccountSnapshot>,
        now: DateTime<Utc>,
        report: &mut CycleReport,
    ) -> FxResult<()> {
        let profile = self.governor.profile(&slot.account).unwrap_or_default();
        let condition = self
            .governor
            .applied_condition(&slot.account)
            .unwrap_or_default();

        let signal = signal.with_risk(profile.position_size_multiplier, condition);
        let candidate = &signal.candidate;

        let Some(account) = accounts.get_mut(&slot.account) else {
            self.hold_back(&signal, "account snapshot unavailable", report);
            return Ok(());
        };
        if account.open_positions >= profile.max_positions {
            self.hold_back(&signal, "max positions reached", report);
            return Ok(());
        }
        if account
            .margin_usage()
            .is_some_and(|usage| usage >= profile.max_margin_usage)
        {
            self.hold_back(&signal, "margin cap reached", report);
            return Ok(());
        }

        let atr = views
            .get(candidate.instrument.as_str())
            .and_then(|view| Decimal::try_from(view.indicators.atr).ok());
        let sized = Decimal::try_from(candidate.price)
            .ok()
            .map(|price| price.round_dp(6))
            .and_then(|entry| {
                self.sizer
                    .size(
                        &candidate.instrument,
                        candidate.side,
                        entry,
                        account.balance,
                        &profile,
                        &slot.stop_loss,
                        &slot.take_profit,
                        atr,
                    )
                    .map(|order| (entry, order))
            });
        let Some((entry, order)) = sized else {
            self.hold_back(&signal, "order could not be sized", report);
            return Ok(());
        };

        let ticket = OrderTicket {
            client_id: Uuid::new_v4().to_string(),
            account: slot.account.clone(),
            instrument: candidate.instrument.clone(),
            side: candidate.side,
            units: order.units,
            planned_price: entry,
            stop_loss: order.stop_loss,
            take_profit: order.take_profit,
        };

        let record = self.tracker.record_signal(signal, now);
        let id = record.id();
        self.journal(SinkEntry::Signal(record)).await;

        let trade = self.tracker.open_trade(&ticket, Some(id), account.balance, now);
        self.journal(SinkEntry::Trade(trade)).await;
        let sent = self
            .tracker
            .mark_sent(id, Some(ticket.client_id.clone()), now)?;
        self.journal(SinkEntry::Signal(sent)).await;
        report.submitted += 1;

        let gateway = &self.collaborators.gateway;
        let outcome = match timeout(self.timeout, gateway.submit(&ticket)).await {
            Ok(result) => result,
            Err(_) => Err(GatewayError::Timeout {
                operation: "submit".to_string(),
                millis: self.timeout_ms(),
            }),
        };

        match outcome {
            Ok(submission) => {
                let filled = self.tracker.fill_trade(
                    &ticket.client_id,
                    &submission.trade_id,
                    submission.fill_price,
                    submission.filled_at,
                )?;
                self.journal(SinkEntry::Trade(filled)).await;
                let executed = self.tracker.mark_executed(id, now)?;
                self.journal(SinkEntry::Signal(executed)).await;

                account.open_positions = account.open_positions.saturating_add(1);
                report.filled += 1;
            }
            Err(e) => {
                warn!(
                    signal_id = %id,
                    trade_id = %ticket.client_id,
                    gateway = gateway.name(),
                    error = %e,
                    "Order submission failed"
                );
                let reason = e.to_string();
                let rejected = self.tracker.reject_trade(&ticket.client_id, &reason, now)?;
                self.journal(SinkEntry::Trade(rejected)).await;
                let cancelled = self.tracker.cancel_signal(id, reason, now)?;
                self.journal(SinkEntry::Signal(cancelled)).await;
                report.rejected += 1;
            }
        }
        Ok(())
    }

    fn hold_back(&self, signal: &ApprovedSignal, reason: &str, report: &mut CycleReport) {
        info!(
            strategy = %signal.strategy_id(),
            instrument = %signal.candidate.instrument,
            side = %signal.candidate.side,
            reason,
            "Approved signal not submitted"
        );
        report.held_back += 1;
    }

    /// Append to the sink; failures are logged and never abort the cycle.
    async fn journal(&self, entry: SinkEntry) {
        let sink = &self.collaborators.sink;
        match timeout(self.timeout, sink.append(&entry)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(sink = sink.name(), error = %e, "Failed to journal entry"),
            Err(_) => warn!(
                sink = sink.name(),
                timeout_ms = self.timeout_ms(),
                "Journal append timed out"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use fxsignal_broker::{PaperConfig, PaperGateway};
    use fxsignal_config::parse_config;
    use fxsignal_core::{
        MarketCondition, NoopOracle, ReductionRequest, SignalState, Submission, TradeState,
    };
    use fxsignal_data::CsvReplayProvider;
    use fxsignal_monitor::MemorySink;
    use rust_decimal_macros::dec;
    use std::sync::Mutex;

    const CONFIG: &str = r#"
[engine]
collaborator_timeout_ms = 50

[[sessions]]
name = "all_day"
start_hour = 0
end_hour = 23

[[risk.accounts]]
name = "primary"
initial_balance = 10000

[[strategies]]
name = "trend"
kind = "ema_trend"
instruments = ["EUR_USD"]
max_trades_per_day = 3
max_daily_quality_trades = 2
min_confirmations = 1
session_windows = ["all_day"]
restrict_to_sessions = false
min_spacing_minutes = 60
min_adx = 0.0
min_momentum = 0.0
min_volatility = 0.0
stop_loss_spec = { method = "pips", pips = 20 }
take_profit_spec = { method = "pips", pips = 40 }
adaptation_cooldown_seconds = 0
"#;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, 8, 0, 0).unwrap()
    }

    /// A gently rising EUR_USD series, one sample per minute.
    fn rising(count: usize) -> Vec<PriceSample> {
        (0..count)
            .map(|i| {
                let mid = 1.1 + i as f64 * 0.00001;
                PriceSample::new(
                    "EUR_USD",
                    mid - 0.00005,
                    mid + 0.00005,
                    start() + Duration::minutes(i as i64),
                )
            })
            .collect()
    }

    fn paper() -> Arc<PaperGateway> {
        Arc::new(PaperGateway::new(
            PaperConfig::default(),
            [("primary".to_string(), dec!(10000))],
        ))
    }

    fn pipeline(
        samples: Vec<PriceSample>,
        gateway: Arc<dyn OrderGateway>,
        sink: Arc<MemorySink>,
    ) -> Pipeline {
        let app = parse_config(CONFIG).unwrap();
        Pipeline::from_config(
            &app,
            Collaborators {
                market_data: Arc::new(CsvReplayProvider::from_samples(samples)),
                gateway,
                oracle: Arc::new(NoopOracle),
                sink,
            },
        )
        .unwrap()
    }

    async fn warm_up(pipeline: &Pipeline, polls: usize) -> DateTime<Utc> {
        let mut latest = start();
        for _ in 0..polls {
            let report = pipeline.poll_prices().await.unwrap();
            latest = report.latest.unwrap_or(latest);
        }
        latest
    }

    #[derive(Clone, Copy, PartialEq)]
    enum SubmitMode {
        Reject,
        Hang,
    }

    struct ScriptedGateway {
        submit: SubmitMode,
        margin_used: Decimal,
        snapshot_fails: bool,
        reductions: Mutex<Vec<ReductionRequest>>,
    }

    impl ScriptedGateway {
        fn new(submit: SubmitMode) -> Self {
            Self {
                submit,
                margin_used: Decimal::ZERO,
                snapshot_fails: false,
                reductions: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl OrderGateway for ScriptedGateway {
        async fn submit(&self, _ticket: &OrderTicket) -> Result<Submission, GatewayError> {
            match self.submit {
                SubmitMode::Reject => Err(GatewayError::Rejected("market closed".to_string())),
                SubmitMode::Hang => std::future::pending().await,
            }
        }

        async fn request_reduction(&self, request: &ReductionRequest) -> Result<(), GatewayError> {
            self.reductions.lock().unwrap().push(request.clone());
            Ok(())
        }

        async fn account_snapshot(&self, account: &str) -> Result<AccountSnapshot, GatewayError> {
            if self.snapshot_fails {
                return Err(GatewayError::Connection("connection reset".to_string()));
            }
            Ok(AccountSnapshot {
                account: account.to_string(),
                balance: dec!(10000),
                margin_used: self.margin_used,
                open_positions: 0,
                unrealized_pnl: Decimal::ZERO,
            })
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    #[tokio::test]
    async fn test_cycle_submits_and_records_lifecycle() {
        let gateway = paper();
        let sink = Arc::new(MemorySink::new());
        let pipeline = pipeline(rising(30), gateway.clone(), sink.clone());

        let now = warm_up(&pipeline, 30).await;
        let report = pipeline.evaluate_cycle(now).await.unwrap();

        assert_eq!(report.instruments_evaluated, 1);
        assert_eq!(report.accounts_evaluated, 1);
        assert_eq!(report.candidates, 1);
        assert_eq!(report.admitted, 1);
        assert_eq!(report.approved, 1);
        assert_eq!(report.submitted, 1);
        assert_eq!(report.filled, 1);
        assert_eq!(report.condition, MarketCondition::Normal);
        assert_eq!(gateway.open_positions("primary"), 1);

        // 1% of 10000 over a 20 pip stop
        let filled = pipeline.tracker().trades_in(TradeState::Filled);
        assert_eq!(filled.len(), 1);
        assert_eq!(filled[0].units, dec!(50000));
        assert_eq!(filled[0].opened_at, Some(now));

        let states: Vec<SignalState> = sink.signals().iter().map(|r| r.state).collect();
        assert_eq!(
            states,
            vec![SignalState::Generated, SignalState::Sent, SignalState::Executed]
        );
        assert_eq!(sink.trades().len(), 2);
    }

    #[tokio::test]
    async fn test_spacing_holds_across_cycles() {
        let sink = Arc::new(MemorySink::new());
        let pipeline = pipeline(rising(40), paper(), sink.clone());

        let now = warm_up(&pipeline, 30).await;
        assert_eq!(pipeline.evaluate_cycle(now).await.unwrap().approved, 1);

        let later = warm_up(&pipeline, 10).await;
        let report = pipeline.evaluate_cycle(later).await.unwrap();
        assert_eq!(report.admitted, 1);
        assert_eq!(report.approved, 0);
        assert_eq!(pipeline.gates().approved_count("trend"), 1);
    }

    #[tokio::test]
    async fn test_stop_loss_close_flows_back() {
        let mut samples = rising(30);
        samples.push(PriceSample::new(
            "EUR_USD",
            1.0949,
            1.0951,
            start() + Duration::minutes(30),
        ));
        let sink = Arc::new(MemorySink::new());
        let pipeline = pipeline(samples, paper(), sink.clone());

        let now = warm_up(&pipeline, 30).await;
        pipeline.evaluate_cycle(now).await.unwrap();

        let report = pipeline.poll_prices().await.unwrap();
        assert_eq!(report.closed, 1);

        let closed = pipeline.tracker().trades_in(TradeState::Closed);
        assert_eq!(closed.len(), 1);
        assert!(closed[0].pips.unwrap() < Decimal::ZERO);
        assert_eq!(closed[0].closed_at, Some(start() + Duration::minutes(30)));
        assert_eq!(pipeline.tracker().stats().losing_trades, 1);
        assert_eq!(sink.trades().last().map(|t| t.state), Some(TradeState::Closed));
    }

    #[tokio::test]
    async fn test_rejected_order_cancels_signal() {
        let sink = Arc::new(MemorySink::new());
        let gateway = Arc::new(ScriptedGateway::new(SubmitMode::Reject));
        let pipeline = pipeline(rising(30), gateway, sink.clone());

        let now = warm_up(&pipeline, 30).await;
        let report = pipeline.evaluate_cycle(now).await.unwrap();

        assert_eq!(report.submitted, 1);
        assert_eq!(report.rejected, 1);
        assert_eq!(report.filled, 0);

        let rejected = pipeline.tracker().trades_in(TradeState::Rejected);
        assert_eq!(rejected.len(), 1);
        assert!(rejected[0].note.as_deref().unwrap().contains("market closed"));
        assert_eq!(pipeline.tracker().signal_count(SignalState::Cancelled), 1);
    }

    #[tokio::test]
    async fn test_hanging_gateway_times_out() {
        let sink = Arc::new(MemorySink::new());
        let gateway = Arc::new(ScriptedGateway::new(SubmitMode::Hang));
        let pipeline = pipeline(rising(30), gateway, sink.clone());

        let now = warm_up(&pipeline, 30).await;
        let report = pipeline.evaluate_cycle(now).await.unwrap();

        assert_eq!(report.rejected, 1);
        let rejected = pipeline.tracker().trades_in(TradeState::Rejected);
        assert!(rejected[0].note.as_deref().unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn test_unavailable_account_is_skipped() {
        let sink = Arc::new(MemorySink::new());
        let mut gateway = ScriptedGateway::new(SubmitMode::Reject);
        gateway.snapshot_fails = true;
        let pipeline = pipeline(rising(30), Arc::new(gateway), sink.clone());

        let now = warm_up(&pipeline, 30).await;
        let report = pipeline.evaluate_cycle(now).await.unwrap();

        assert_eq!(report.accounts_skipped, 1);
        assert_eq!(report.accounts_evaluated, 0);
        assert_eq!(report.approved, 1);
        assert_eq!(report.held_back, 1);
        assert_eq!(pipeline.tracker().signal_count(SignalState::Generated), 0);
        assert_eq!(pipeline.tracker().signal_count(SignalState::Cancelled), 0);
        assert_eq!(report.submitted, 0);
        assert!(pipeline.tracker().trades_in(TradeState::Pending).is_empty());
    }

    #[tokio::test]
    async fn test_critical_margin_pauses_and_reduces() {
        let sink = Arc::new(MemorySink::new());
        let mut gateway = ScriptedGateway::new(SubmitMode::Reject);
        gateway.margin_used = dec!(9500);
        let gateway = Arc::new(gateway);
        let pipeline = pipeline(rising(30), gateway.clone(), sink.clone());

        let now = warm_up(&pipeline, 30).await;
        let report = pipeline.evaluate_cycle(now).await.unwrap();

        assert_eq!(report.condition, MarketCondition::RiskOff);
        assert_eq!(report.adaptations, 1);
        assert_eq!(report.reductions, 1);
        assert_eq!(report.admitted, 1);
        assert_eq!(report.approved, 0);

        let reductions = gateway.reductions.lock().unwrap();
        assert_eq!(reductions.len(), 1);
        assert_eq!(reductions[0].margin_usage, dec!(0.95));

        let adaptations = sink.adaptations();
        assert_eq!(adaptations.len(), 1);
        assert_eq!(adaptations[0].detected, MarketCondition::RiskOff);
        assert!(adaptations[0].profile.is_paused());
    }

    #[tokio::test]
    async fn test_cold_history_produces_nothing() {
        let sink = Arc::new(MemorySink::new());
        let pipeline = pipeline(rising(5), paper(), sink.clone());

        let now = warm_up(&pipeline, 8).await;
        let report = pipeline.evaluate_cycle(now).await.unwrap();

        assert_eq!(report.instruments_evaluated, 1);
        assert_eq!(report.candidates, 0);
        assert!(sink.signals().is_empty());
    }
}
