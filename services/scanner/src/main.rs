//! Scanner entry point
//!
//! Three modes: a single primary-venue pass, a single secondary-venue pass,
//! and a watch loop that schedules both on their candle periods. The watch
//! loop caps overlapping passes with a semaphore and skips a tick instead
//! of queueing when the cap is hit.

use anyhow::Context;
use candlescan_scanner::classify::{ClassifierParams, Evaluation};
use candlescan_scanner::config::ScannerConfig;
use candlescan_scanner::fetch::{BinanceSource, CandleSource, MoexSource};
use candlescan_scanner::notify::{Notifier, NullNotifier, TelegramNotifier};
use candlescan_scanner::pipeline::{run_pass, RunContext};
use candlescan_scanner::storage::{JsonlStore, SignalStore};
use candlescan_types::Timeframe;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "scanner", about = "Periodic candle scanner", version)]
struct Cli {
    /// Path to the TOML configuration. Falls back to the CANDLESCAN_CONFIG
    /// environment variable, then to built-in defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// One pass over the primary venue's pairs.
    RunOnce {
        #[arg(long, default_value = "1h")]
        timeframe: Timeframe,
    },
    /// One pass over the secondary venue's securities. The interval is the
    /// venue's own code: 60 for hourly, 24 for daily.
    RunOnceSecondary {
        #[arg(long, default_value_t = 60)]
        interval: u32,
    },
    /// Schedule both venues on their candle periods until interrupted.
    Watch,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config)?;

    let store: Arc<dyn SignalStore> =
        Arc::new(JsonlStore::open(&config.storage_path).context("opening signal store")?);

    match cli.command {
        Command::RunOnce { timeframe } => {
            let ctx = binance_context(&config, timeframe, store)?;
            run_pass(&ctx).await;
        }
        Command::RunOnceSecondary { interval } => {
            let timeframe = Timeframe::from_moex_interval(interval)
                .with_context(|| format!("unsupported interval {interval}, expected 60 or 24"))?;
            let ctx = moex_context(&config, timeframe, store)?;
            run_pass(&ctx).await;
        }
        Command::Watch => watch(&config, store).await?,
    }
    Ok(())
}

fn load_config(path: Option<PathBuf>) -> anyhow::Result<ScannerConfig> {
    let path = path.or_else(|| std::env::var_os("CANDLESCAN_CONFIG").map(PathBuf::from));
    match path {
        Some(path) => {
            let config = ScannerConfig::load(&path)
                .with_context(|| format!("loading {}", path.display()))?;
            info!(path = %path.display(), "configuration loaded");
            Ok(config)
        }
        None => {
            info!("no configuration file given, using defaults");
            let config = ScannerConfig::default();
            config.validate()?;
            Ok(config)
        }
    }
}

fn notifier_for(token: &str, chat_ids: &[i64]) -> anyhow::Result<Arc<dyn Notifier>> {
    if token.is_empty() || chat_ids.is_empty() {
        warn!("telegram not configured, notifications disabled");
        return Ok(Arc::new(NullNotifier));
    }
    Ok(Arc::new(TelegramNotifier::new(token, chat_ids.to_vec())?))
}

fn binance_context(
    config: &ScannerConfig,
    timeframe: Timeframe,
    store: Arc<dyn SignalStore>,
) -> anyhow::Result<RunContext> {
    let source: Arc<dyn CandleSource> = Arc::new(BinanceSource::new(&config.binance.base_url)?);
    let notifier = notifier_for(&config.telegram.bot_token, &config.telegram.chat_ids)?;
    Ok(RunContext {
        exchange: "Binance".to_string(),
        instruments: config.binance.pairs.clone(),
        timeframe,
        source,
        store,
        notifier,
        candle_limit: config.candle_limit,
        params: ClassifierParams {
            evaluation: Evaluation::Penultimate,
            thresholds: config.binance.thresholds,
        },
    })
}

fn moex_context(
    config: &ScannerConfig,
    timeframe: Timeframe,
    store: Arc<dyn SignalStore>,
) -> anyhow::Result<RunContext> {
    let source: Arc<dyn CandleSource> = Arc::new(MoexSource::new(
        &config.moex.base_url,
        &config.moex.board,
        config.moex.history_days,
    )?);
    // Fall back to the primary bot when no dedicated one is configured.
    let (token, chat_ids) = if config.telegram.moex_bot_token.is_empty() {
        (&config.telegram.bot_token, &config.telegram.chat_ids)
    } else {
        (&config.telegram.moex_bot_token, &config.telegram.moex_chat_ids)
    };
    let notifier = notifier_for(token, chat_ids)?;
    Ok(RunContext {
        exchange: "MOEX".to_string(),
        instruments: config.moex.securities.clone(),
        timeframe,
        source,
        store,
        notifier,
        candle_limit: config.candle_limit,
        params: ClassifierParams {
            evaluation: Evaluation::Last,
            thresholds: config.moex.thresholds_for(timeframe),
        },
    })
}

fn period_of(timeframe: Timeframe) -> Duration {
    match timeframe {
        Timeframe::H1 => Duration::from_secs(3_600),
        Timeframe::H4 => Duration::from_secs(4 * 3_600),
        Timeframe::D1 => Duration::from_secs(24 * 3_600),
    }
}

async fn watch(config: &ScannerConfig, store: Arc<dyn SignalStore>) -> anyhow::Result<()> {
    let permits = Arc::new(Semaphore::new(config.max_concurrent_runs));
    let mut jobs = Vec::new();

    for &timeframe in &config.binance.timeframes {
        jobs.push(spawn_job(
            binance_context(config, timeframe, store.clone())?,
            permits.clone(),
        ));
    }
    for &timeframe in &config.moex.timeframes {
        jobs.push(spawn_job(
            moex_context(config, timeframe, store.clone())?,
            permits.clone(),
        ));
    }

    info!(jobs = jobs.len(), "watch loop started");
    for job in jobs {
        job.await?;
    }
    Ok(())
}

fn spawn_job(ctx: RunContext, permits: Arc<Semaphore>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period_of(ctx.timeframe));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            match permits.clone().try_acquire_owned() {
                Ok(_permit) => {
                    run_pass(&ctx).await;
                }
                Err(_) => {
                    warn!(
                        exchange = %ctx.exchange,
                        timeframe = %ctx.timeframe,
                        "run cap reached, skipping tick"
                    );
                }
            }
        }
    })
}
