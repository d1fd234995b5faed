//! One scan pass over a list of instruments
//!
//! Each instrument runs fetch -> compute -> classify -> persist -> notify.
//! Failures stay inside the instrument: a broken fetch or a down notifier
//! is logged and recorded in the pass report, and the loop moves on.

use crate::classify::{classify, ClassifierParams};
use crate::error::ScanError;
use crate::fetch::CandleSource;
use crate::notify::Notifier;
use crate::storage::SignalStore;
use candlescan_indicators::DerivedSeries;
use candlescan_types::{CandleSeries, Signal, Timeframe};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Everything one pass needs, resolved up front from configuration.
#[derive(Clone)]
pub struct RunContext {
    pub exchange: String,
    pub instruments: Vec<String>,
    pub timeframe: Timeframe,
    pub source: Arc<dyn CandleSource>,
    pub store: Arc<dyn SignalStore>,
    pub notifier: Arc<dyn Notifier>,
    pub candle_limit: usize,
    pub params: ClassifierParams,
}

/// What happened to one stage of one instrument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    Completed,
    /// Not attempted because an earlier stage failed or found nothing.
    Skipped,
    Failed(String),
}

impl StageOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, StageOutcome::Failed(_))
    }
}

#[derive(Debug, Clone)]
pub struct InstrumentReport {
    pub instrument: String,
    pub fetch: StageOutcome,
    pub compute: StageOutcome,
    pub persist: StageOutcome,
    pub notify: StageOutcome,
    pub signal: Option<Signal>,
}

impl InstrumentReport {
    fn new(instrument: &str) -> Self {
        Self {
            instrument: instrument.to_string(),
            fetch: StageOutcome::Skipped,
            compute: StageOutcome::Skipped,
            persist: StageOutcome::Skipped,
            notify: StageOutcome::Skipped,
            signal: None,
        }
    }
}

/// Run one full pass, returning a report per instrument in input order.
pub async fn run_pass(ctx: &RunContext) -> Vec<InstrumentReport> {
    info!(
        exchange = %ctx.exchange,
        timeframe = %ctx.timeframe,
        instruments = ctx.instruments.len(),
        "starting pass"
    );
    let mut reports = Vec::with_capacity(ctx.instruments.len());
    for instrument in &ctx.instruments {
        reports.push(process_instrument(ctx, instrument).await);
    }
    let signals = reports.iter().filter(|r| r.signal.is_some()).count();
    info!(exchange = %ctx.exchange, timeframe = %ctx.timeframe, signals, "pass complete");
    reports
}

async fn process_instrument(ctx: &RunContext, instrument: &str) -> InstrumentReport {
    let mut report = InstrumentReport::new(instrument);

    let candles = match ctx
        .source
        .fetch(instrument, ctx.timeframe, ctx.candle_limit)
        .await
    {
        Ok(candles) => {
            report.fetch = StageOutcome::Completed;
            candles
        }
        Err(e) => {
            if e.is_remote_unavailable() {
                warn!(instrument, timeframe = %ctx.timeframe, error = %e, "remote unavailable, skipping");
            } else {
                error!(instrument, timeframe = %ctx.timeframe, error = %e, "fetch failed");
            }
            report.fetch = StageOutcome::Failed(e.to_string());
            return report;
        }
    };

    let signal = match evaluate(ctx, instrument, candles) {
        Ok(signal) => {
            report.compute = StageOutcome::Completed;
            signal
        }
        Err(e) => {
            if e.is_insufficient_history() {
                warn!(instrument, timeframe = %ctx.timeframe, error = %e, "not enough candles, skipping");
            } else {
                error!(instrument, timeframe = %ctx.timeframe, error = %e, "computation failed");
            }
            report.compute = StageOutcome::Failed(e.to_string());
            return report;
        }
    };

    let Some(mut signal) = signal else {
        info!(instrument, timeframe = %ctx.timeframe, "pattern not found");
        return report;
    };
    info!(
        instrument,
        timeframe = %ctx.timeframe,
        signal_type = %signal.signal_type,
        "pattern found"
    );

    // Persistence and notification are independent: a dead store must not
    // silence the alert, and vice versa.
    match ctx.store.insert(&signal, &ctx.exchange).await {
        Ok(id) => {
            signal.id = Some(id);
            report.persist = StageOutcome::Completed;
        }
        Err(e) => {
            error!(instrument, error = %e, "persist failed");
            report.persist = StageOutcome::Failed(e.to_string());
        }
    }

    match ctx.notifier.send(&signal).await {
        Ok(()) => report.notify = StageOutcome::Completed,
        Err(e) => {
            error!(instrument, error = %e, "notification failed");
            report.notify = StageOutcome::Failed(e.to_string());
        }
    }

    report.signal = Some(signal);
    report
}

fn evaluate(
    ctx: &RunContext,
    instrument: &str,
    candles: Vec<candlescan_types::Candle>,
) -> Result<Option<Signal>, ScanError> {
    let series = CandleSeries::new(instrument, ctx.timeframe, candles)?;
    let derived = DerivedSeries::compute(&series);
    classify(&series, &derived, &ctx.params)
}
