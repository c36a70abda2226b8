//! Background ingestion and governance tasks.

use crate::pipeline::Pipeline;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration as StdDuration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Handle to the running ingestion and governance tasks.
///
/// Cancellation is raced against the in-flight poll or cycle, so a slow
/// collaborator never delays shutdown. An abandoned cycle leaves any signal
/// it already sent in `Sent`.
pub struct Runtime {
    cancel: CancellationToken,
    ingestion: JoinHandle<()>,
    governance: JoinHandle<()>,
}

impl Runtime {
    /// Start polling prices every `poll_interval` and running a governance
    /// cycle every `evaluation_interval`.
    pub fn spawn(
        pipeline: Arc<Pipeline>,
        poll_interval: StdDuration,
        evaluation_interval: StdDuration,
    ) -> Self {
        let cancel = CancellationToken::new();

        let ingestion = tokio::spawn(ingest_loop(
            Arc::clone(&pipeline),
            poll_interval,
            cancel.clone(),
        ));
        let governance = tokio::spawn(govern_loop(pipeline, evaluation_interval, cancel.clone()));

        info!(
            poll_ms = poll_interval.as_millis() as u64,
            evaluation_ms = evaluation_interval.as_millis() as u64,
            "Runtime started"
        );
        Self {
            cancel,
            ingestion,
            governance,
        }
    }

    /// Token that stops both tasks when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Stop both tasks and wait for them to finish.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        for (task, handle) in [("ingestion", self.ingestion), ("governance", self.governance)] {
            if let Err(e) = handle.await {
                warn!(task, error = %e, "Task ended abnormally");
            }
        }
        info!("Runtime stopped");
    }
}

async fn ingest_loop(pipeline: Arc<Pipeline>, period: StdDuration, cancel: CancellationToken) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("Price poll abandoned on shutdown");
                break;
            }
            polled = pipeline.poll_prices() => match polled {
                Ok(report) => debug!(
                    ingested = report.ingested,
                    skipped = report.skipped,
                    closed = report.closed,
                    "Prices polled"
                ),
                Err(e) => error!(error = %e, "Price ingestion failed"),
            },
        }
    }
    debug!("Ingestion task stopped");
}

async fn govern_loop(pipeline: Arc<Pipeline>, period: StdDuration, cancel: CancellationToken) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        tokio::select! {
            _ = cancel.cancelled() => {
                warn!("Governance cycle abandoned on shutdown");
                break;
            }
            cycle = pipeline.evaluate_cycle(Utc::now()) => match cycle {
                Ok(report) => info!("{}", report),
                Err(e) => error!(error = %e, "Governance cycle failed"),
            },
        }
    }
    debug!("Governance task stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::Collaborators;
    use async_trait::async_trait;
    use chrono::Duration;
    use fxsignal_broker::{PaperConfig, PaperGateway};
    use fxsignal_config::parse_config;
    use fxsignal_core::error::DataError;
    use fxsignal_core::{MarketDataProvider, NoopOracle, PriceSample};
    use fxsignal_data::CsvReplayProvider;
    use fxsignal_monitor::MemorySink;
    use rust_decimal_macros::dec;

    const CONFIG: &str = r#"
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
session_windows = []
min_spacing_minutes = 60
min_adx = 0.0
min_momentum = 0.0
min_volatility = 0.0
stop_loss_spec = { method = "pips", pips = 20 }
take_profit_spec = { method = "pips", pips = 40 }
adaptation_cooldown_seconds = 0
"#;

    /// Feed that never answers within any sane timeout.
    struct StalledFeed;

    #[async_trait]
    impl MarketDataProvider for StalledFeed {
        async fn get_price(&self, instrument: &str) -> Result<PriceSample, DataError> {
            tokio::time::sleep(StdDuration::from_secs(60)).await;
            Err(DataError::Unavailable {
                instrument: instrument.to_string(),
                reason: "stalled".to_string(),
            })
        }

        fn name(&self) -> &str {
            "stalled"
        }
    }

    const STALLED_CONFIG: &str = r#"
[engine]
collaborator_timeout_ms = 5000

[[risk.accounts]]
name = "primary"
initial_balance = 10000

[[strategies]]
name = "trend"
kind = "ema_trend"
instruments = ["EUR_USD", "GBP_USD", "USD_JPY"]
max_trades_per_day = 3
max_daily_quality_trades = 2
min_confirmations = 1
session_windows = []
min_spacing_minutes = 60
min_adx = 0.0
min_momentum = 0.0
min_volatility = 0.0
stop_loss_spec = { method = "pips", pips = 20 }
take_profit_spec = { method = "pips", pips = 40 }
adaptation_cooldown_seconds = 0
"#;

    #[tokio::test]
    async fn test_shutdown_does_not_wait_for_stalled_feed() {
        let app = parse_config(STALLED_CONFIG).unwrap();
        let pipeline = Pipeline::from_config(
            &app,
            Collaborators {
                market_data: Arc::new(StalledFeed),
                gateway: Arc::new(PaperGateway::new(
                    PaperConfig::default(),
                    [("primary".to_string(), dec!(10000))],
                )),
                oracle: Arc::new(NoopOracle),
                sink: Arc::new(MemorySink::new()),
            },
        )
        .unwrap();

        let runtime = Runtime::spawn(
            Arc::new(pipeline),
            StdDuration::from_millis(10),
            StdDuration::from_millis(10),
        );
        tokio::time::sleep(StdDuration::from_millis(50)).await;

        let started = std::time::Instant::now();
        tokio::time::timeout(StdDuration::from_secs(1), runtime.shutdown())
            .await
            .unwrap();
        assert!(started.elapsed() < StdDuration::from_millis(500));
    }

    #[tokio::test]
    async fn test_runtime_polls_and_shuts_down() {
        let start = Utc::now() - Duration::hours(1);
        let samples: Vec<PriceSample> = (0..500)
            .map(|i| {
                PriceSample::from_mid("EUR_USD", 1.1 + i as f64 * 0.00001, start + Duration::seconds(i))
            })
            .collect();
        let feed = Arc::new(CsvReplayProvider::from_samples(samples));

        let app = parse_config(CONFIG).unwrap();
        let pipeline = Pipeline::from_config(
            &app,
            Collaborators {
                market_data: feed.clone(),
                gateway: Arc::new(PaperGateway::new(
                    PaperConfig::default(),
                    [("primary".to_string(), dec!(10000))],
                )),
                oracle: Arc::new(NoopOracle),
                sink: Arc::new(MemorySink::new()),
            },
        )
        .unwrap();

        let runtime = Runtime::spawn(
            Arc::new(pipeline),
            StdDuration::from_millis(10),
            StdDuration::from_millis(20),
        );
        let token = runtime.cancellation_token();
        tokio::time::sleep(StdDuration::from_millis(200)).await;

        tokio::time::timeout(StdDuration::from_secs(1), runtime.shutdown())
            .await
            .unwrap();

        assert!(token.is_cancelled());
        assert!(feed.total_remaining() < 500);
    }
}
