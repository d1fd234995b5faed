//! End-to-end pass behavior against mock venue, store and notifier.

use async_trait::async_trait;
use candlescan_scanner::classify::{ClassifierParams, Evaluation};
use candlescan_scanner::config::Thresholds;
use candlescan_scanner::error::{Result, ScanError};
use candlescan_scanner::fetch::CandleSource;
use candlescan_scanner::notify::Notifier;
use candlescan_scanner::pipeline::{run_pass, RunContext, StageOutcome};
use candlescan_scanner::storage::{MemoryStore, SignalStore};
use candlescan_types::{Candle, Signal, SignalType, Timeframe};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Clone)]
enum Venue {
    Candles(Vec<Candle>),
    Unavailable,
}

struct StaticSource {
    instruments: HashMap<String, Venue>,
}

#[async_trait]
impl CandleSource for StaticSource {
    async fn fetch(
        &self,
        instrument: &str,
        _timeframe: Timeframe,
        _limit: usize,
    ) -> Result<Vec<Candle>> {
        match self.instruments.get(instrument) {
            Some(Venue::Candles(candles)) => Ok(candles.clone()),
            Some(Venue::Unavailable) => Err(ScanError::RemoteUnavailable {
                message: "venue is down".to_string(),
            }),
            None => Err(ScanError::MalformedPayload {
                message: format!("unknown instrument {instrument}"),
            }),
        }
    }
}

#[derive(Default)]
struct RecordingNotifier {
    sent: Mutex<Vec<Signal>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, signal: &Signal) -> Result<()> {
        self.sent.lock().await.push(signal.clone());
        Ok(())
    }
}

struct DeadStore;

#[async_trait]
impl SignalStore for DeadStore {
    async fn insert(&self, _signal: &Signal, _exchange: &str) -> Result<i64> {
        Err(ScanError::Storage {
            message: "disk full".to_string(),
        })
    }
}

fn candle(i: usize, volume: f64, taker: f64) -> Candle {
    let base = 100.0 + (i % 7) as f64 * 0.3;
    Candle {
        open_time: i as i64 * 3_600_000,
        open: base,
        high: base + 0.8,
        low: base - 0.6,
        close: base + 0.2,
        volume,
        taker_buy_volume: Some(taker),
    }
}

/// Fifty candles of steady volume: no rule can fire.
fn quiet_candles() -> Vec<Candle> {
    (0..50).map(|i| candle(i, 1_000.0, 500.0)).collect()
}

/// Steady volume with a large one-sided burst at the evaluation index
/// (the penultimate candle), pushing both the volume oscillator and the
/// normalized delta past the default thresholds.
fn spike_candles() -> Vec<Candle> {
    let mut candles = quiet_candles();
    candles[48] = candle(48, 10_000.0, 9_500.0);
    candles
}

/// Fifty candles with the close pinned to the midpoint, so the oscillator
/// signal line sits at exactly zero, plus a moderate volume bump at the
/// evaluation index: enough for the flat rule, not enough for the spike.
fn flat_candles() -> Vec<Candle> {
    let mut candles: Vec<Candle> = (0..50)
        .map(|i| Candle {
            open_time: i as i64 * 3_600_000,
            open: 100.0,
            high: 101.0,
            low: 99.0,
            close: 100.0,
            volume: 1_000.0,
            taker_buy_volume: Some(500.0),
        })
        .collect();
    candles[48].volume = 2_000.0;
    candles[48].taker_buy_volume = Some(1_000.0);
    candles
}

fn context(
    instruments: Vec<(&str, Venue)>,
    store: Arc<dyn SignalStore>,
    notifier: Arc<dyn Notifier>,
) -> RunContext {
    let order: Vec<String> = instruments.iter().map(|(n, _)| n.to_string()).collect();
    let source = StaticSource {
        instruments: instruments
            .into_iter()
            .map(|(n, v)| (n.to_string(), v))
            .collect(),
    };
    RunContext {
        exchange: "Binance".to_string(),
        instruments: order,
        timeframe: Timeframe::H1,
        source: Arc::new(source),
        store,
        notifier,
        candle_limit: 50,
        params: ClassifierParams {
            evaluation: Evaluation::Penultimate,
            thresholds: Thresholds::default(),
        },
    }
}

#[tokio::test]
async fn volume_burst_is_detected_persisted_and_notified() {
    let store = Arc::new(MemoryStore::new());
    let notifier = Arc::new(RecordingNotifier::default());
    let ctx = context(
        vec![("BTCUSDT", Venue::Candles(spike_candles()))],
        store.clone(),
        notifier.clone(),
    );

    let reports = run_pass(&ctx).await;
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].persist, StageOutcome::Completed);
    assert_eq!(reports[0].notify, StageOutcome::Completed);

    let signal = reports[0].signal.as_ref().unwrap();
    assert_eq!(signal.signal_type, SignalType::VolumeSpike);
    assert_eq!(signal.id, Some(1));
    // The penultimate candle is the one classified.
    assert_eq!(signal.evaluation_time, 48 * 3_600_000);
    assert!(signal.volume_oscillator > 20.0);
    assert!(signal.delta.unwrap() > 2.8);

    let rows = store.rows().await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].exchange, "Binance");

    let sent = notifier.sent.lock().await;
    assert_eq!(sent.len(), 1);
    assert!(sent[0].message().contains("BTCUSDT"));
}

#[tokio::test]
async fn flat_oscillator_with_raised_volume_is_detected() {
    let store = Arc::new(MemoryStore::new());
    let notifier = Arc::new(RecordingNotifier::default());
    let ctx = context(
        vec![("ADAUSDT", Venue::Candles(flat_candles()))],
        store.clone(),
        notifier.clone(),
    );

    let reports = run_pass(&ctx).await;
    let signal = reports[0].signal.as_ref().unwrap();
    assert_eq!(signal.signal_type, SignalType::FlatAndVolume);
    assert_eq!(signal.extra["flat_value"], 0.0);
    assert!(signal.volume_oscillator > 10.0);
    assert!(notifier.sent.lock().await[0]
        .message()
        .contains("pattern: FLATnVOLUME"));
}

#[tokio::test]
async fn two_identical_candles_emit_nothing() {
    let store = Arc::new(MemoryStore::new());
    let notifier = Arc::new(RecordingNotifier::default());
    let identical = |open_time| Candle {
        open_time,
        open: 100.0,
        high: 100.0,
        low: 100.0,
        close: 100.0,
        volume: 1_000.0,
        taker_buy_volume: Some(500.0),
    };
    let pair = vec![identical(0), identical(3_600_000)];
    let ctx = context(
        vec![("BTCUSDT", Venue::Candles(pair))],
        store.clone(),
        notifier.clone(),
    );

    let reports = run_pass(&ctx).await;
    assert_eq!(reports[0].compute, StageOutcome::Completed);
    assert!(reports[0].signal.is_none());
    assert!(store.rows().await.is_empty());
}

#[tokio::test]
async fn quiet_market_touches_neither_store_nor_notifier() {
    let store = Arc::new(MemoryStore::new());
    let notifier = Arc::new(RecordingNotifier::default());
    let ctx = context(
        vec![("BTCUSDT", Venue::Candles(quiet_candles()))],
        store.clone(),
        notifier.clone(),
    );

    let reports = run_pass(&ctx).await;
    assert_eq!(reports[0].compute, StageOutcome::Completed);
    assert!(reports[0].signal.is_none());
    assert_eq!(reports[0].persist, StageOutcome::Skipped);
    assert!(store.rows().await.is_empty());
    assert!(notifier.sent.lock().await.is_empty());
}

#[tokio::test]
async fn one_broken_instrument_never_blocks_the_rest() {
    let store = Arc::new(MemoryStore::new());
    let notifier = Arc::new(RecordingNotifier::default());
    let ctx = context(
        vec![
            ("AAAUSDT", Venue::Candles(quiet_candles())),
            ("BBBUSDT", Venue::Unavailable),
            ("CCCUSDT", Venue::Candles(spike_candles())),
        ],
        store.clone(),
        notifier.clone(),
    );

    let reports = run_pass(&ctx).await;
    assert_eq!(reports.len(), 3);

    assert_eq!(reports[0].fetch, StageOutcome::Completed);
    assert!(reports[0].signal.is_none());

    assert!(reports[1].fetch.is_failed());
    assert_eq!(reports[1].compute, StageOutcome::Skipped);

    // The instrument after the failure still completes end to end.
    assert_eq!(reports[2].notify, StageOutcome::Completed);
    assert_eq!(
        reports[2].signal.as_ref().unwrap().instrument,
        "CCCUSDT"
    );
    assert_eq!(store.rows().await.len(), 1);
}

#[tokio::test]
async fn too_little_history_is_skipped_without_persisting() {
    let store = Arc::new(MemoryStore::new());
    let notifier = Arc::new(RecordingNotifier::default());
    let ctx = context(
        vec![("NEWUSDT", Venue::Candles(vec![candle(0, 1_000.0, 500.0)]))],
        store.clone(),
        notifier.clone(),
    );

    let reports = run_pass(&ctx).await;
    assert_eq!(reports[0].fetch, StageOutcome::Completed);
    assert!(reports[0].compute.is_failed());
    assert!(store.rows().await.is_empty());
}

#[tokio::test]
async fn dead_store_does_not_silence_the_alert() {
    let notifier = Arc::new(RecordingNotifier::default());
    let ctx = context(
        vec![("BTCUSDT", Venue::Candles(spike_candles()))],
        Arc::new(DeadStore),
        notifier.clone(),
    );

    let reports = run_pass(&ctx).await;
    assert!(reports[0].persist.is_failed());
    assert_eq!(reports[0].notify, StageOutcome::Completed);
    assert_eq!(notifier.sent.lock().await.len(), 1);
    // No id was assigned since the insert failed.
    assert_eq!(reports[0].signal.as_ref().unwrap().id, None);
}
