//! Run command: replay recorded prices through the pipeline.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use fxsignal_broker::{PaperConfig, PaperGateway};
use fxsignal_config::AppConfig;
use fxsignal_core::{NoopOracle, PersistenceSink, TradeState};
use fxsignal_data::CsvReplayProvider;
use fxsignal_engine::{Collaborators, Pipeline, Runtime};
use fxsignal_monitor::{JsonlSink, MultiSink, TracingSink};
use std::sync::Arc;
use std::time::Duration as StdDuration;
use tracing::info;

use crate::cli::RunArgs;

pub async fn run(args: RunArgs, app: AppConfig) -> Result<()> {
    let feed = Arc::new(
        CsvReplayProvider::from_path(&args.data)
            .with_context(|| format!("Failed to load prices from {}", args.data.display()))?,
    );

    let gateway = Arc::new(PaperGateway::new(
        PaperConfig {
            slippage_pips: app.paper.slippage_pips,
            leverage: app.paper.leverage,
        },
        app.risk
            .accounts
            .iter()
            .map(|a| (a.name.clone(), a.initial_balance)),
    ));

    let mut sinks: Vec<Arc<dyn PersistenceSink>> = vec![Arc::new(TracingSink)];
    if let Some(path) = &args.journal {
        let journal = JsonlSink::open(path)
            .await
            .with_context(|| format!("Failed to open journal {}", path.display()))?;
        info!(path = %path.display(), "Journaling to file");
        sinks.push(Arc::new(journal));
    }

    let pipeline = Arc::new(
        Pipeline::from_config(
            &app,
            Collaborators {
                market_data: feed.clone(),
                gateway: gateway.clone(),
                oracle: Arc::new(NoopOracle),
                sink: Arc::new(MultiSink::new(sinks)),
            },
        )
        .context("Failed to build pipeline")?,
    );

    match args.cycles {
        Some(cycles) => {
            let spacing = Duration::from_std(app.engine.evaluation_interval())
                .context("Evaluation interval out of range")?;
            let completed = replay(&pipeline, &feed, cycles, spacing).await?;
            info!(completed, "Replay finished");
        }
        None => scheduled(&pipeline, &feed, &app).await,
    }

    println!();
    println!("{}", pipeline.tracker().stats().summary());
    println!(
        "Open trades: {}  Rejected: {}",
        pipeline.tracker().trades_in(TradeState::Filled).len(),
        pipeline.tracker().trades_in(TradeState::Rejected).len()
    );
    for book in pipeline.gates().summaries() {
        println!(
            "Strategy {}: {} accumulated, {}/{} approved",
            book.strategy_id, book.accumulated, book.approved, book.cap
        );
    }
    for account in pipeline.governor().accounts() {
        println!(
            "Account {}: condition {}",
            account,
            pipeline.governor().applied_condition(&account).unwrap_or_default()
        );
    }

    Ok(())
}

/// Drive cycles on data time: one cycle as soon as the replayed clock has
/// advanced by the evaluation interval.
async fn replay(
    pipeline: &Pipeline,
    feed: &CsvReplayProvider,
    cycles: usize,
    spacing: Duration,
) -> Result<usize> {
    let mut completed = 0;
    let mut next_cycle: Option<DateTime<Utc>> = None;

    while completed < cycles && !feed.is_exhausted() {
        let ingest = pipeline.poll_prices().await?;
        let Some(latest) = ingest.latest else {
            // Nothing left for the tracked instruments
            break;
        };

        if next_cycle.map_or(true, |at| latest >= at) {
            let report = pipeline.evaluate_cycle(latest).await?;
            println!("{}", report);
            completed += 1;
            next_cycle = Some(latest + spacing);
        }
    }

    Ok(completed)
}

/// Run the background tasks on wall-clock time until the replay is
/// exhausted or the process is interrupted.
async fn scheduled(pipeline: &Arc<Pipeline>, feed: &CsvReplayProvider, app: &AppConfig) {
    let runtime = Runtime::spawn(
        Arc::clone(pipeline),
        app.engine.poll_interval(),
        app.engine.evaluation_interval(),
    );

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut check = tokio::time::interval(StdDuration::from_millis(500));

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                info!("Interrupt received, shutting down");
                break;
            }
            _ = check.tick() => {
                if feed.is_exhausted() {
                    info!("Price data exhausted, shutting down");
                    break;
                }
            }
        }
    }

    runtime.shutdown().await;
}
