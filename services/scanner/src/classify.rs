//! Threshold rule engine over a computed candle series
//!
//! Applies the three pattern rules at one evaluation index and returns at
//! most one signal. Rules run in a fixed order and a later match overwrites
//! an earlier one within the same pass (last-match-wins). The precedence is
//! load-bearing; the tests pin it down explicitly.

use crate::config::Thresholds;
use crate::error::{Result, ScanError};
use candlescan_indicators::DerivedSeries;
use candlescan_types::{CandleSeries, SeriesError, Signal, SignalType, MIN_SERIES_LEN};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Width of the flat-window: how many SMI-signal values before the
/// evaluation index must sit inside the flat band.
pub const FLAT_WINDOW: usize = 12;
/// Flat band half-width; values strictly inside (-band, band) count.
pub const FLAT_BAND: f64 = 0.065;
/// Minimum absolute range deviation for the volume-spike-adjusted rule.
pub const VSA_DEVIATION_MIN: f64 = 0.5;

/// Which candle a pipeline evaluates.
///
/// The primary pipeline treats the final candle as still-forming and
/// classifies the one before it; the secondary pipeline classifies the
/// final candle. Both variants are deliberate configuration, not a detail
/// to unify.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Evaluation {
    Penultimate,
    Last,
}

impl Evaluation {
    pub fn index(&self, len: usize) -> usize {
        match self {
            Evaluation::Penultimate => len - 2,
            Evaluation::Last => len - 1,
        }
    }
}

/// Everything the classifier needs beyond the data itself. Both venue
/// integrations share the one `classify` implementation and differ only in
/// these parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassifierParams {
    pub evaluation: Evaluation,
    pub thresholds: Thresholds,
}

fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// Classify the evaluation index of `series`, returning at most one signal.
///
/// Derived values that are still undefined (`None`) at the evaluation index
/// simply fail the rule that needs them; they never error. Fails with an
/// insufficient-history error for series shorter than the analysis minimum,
/// which callers log and skip per instrument.
pub fn classify(
    series: &CandleSeries,
    derived: &DerivedSeries,
    params: &ClassifierParams,
) -> Result<Option<Signal>> {
    if series.len() < MIN_SERIES_LEN {
        return Err(SeriesError::InsufficientHistory {
            got: series.len(),
            need: MIN_SERIES_LEN,
        }
        .into());
    }
    debug_assert_eq!(series.len(), derived.len());

    let eval = params.evaluation.index(series.len());
    let candle = &series.candles()[eval];

    // Every rule gates on the volume oscillator; without it nothing fires.
    let Some(vo) = derived.volume_oscillator[eval] else {
        return Ok(None);
    };
    let delta = derived.normalized_delta[eval];

    let mut detected: Option<(SignalType, BTreeMap<String, f64>)> = None;

    // Rule 1: flat-and-volume. The 12 SMI-signal values immediately before
    // the evaluation index must all sit strictly inside the flat band.
    if eval >= FLAT_WINDOW {
        let window = &derived.smi_signal[eval - FLAT_WINDOW..eval];
        let in_band: Vec<f64> = window
            .iter()
            .flatten()
            .copied()
            .filter(|v| v.abs() < FLAT_BAND)
            .collect();
        if in_band.len() == FLAT_WINDOW && vo > params.thresholds.flat_vo {
            let flat_value = in_band.iter().sum::<f64>() / in_band.len() as f64;
            let mut extra = BTreeMap::new();
            extra.insert("flat_value".to_string(), round_to(flat_value, 3));
            detected = Some((SignalType::FlatAndVolume, extra));
        }
    }

    // Rule 2: volume-spike-adjusted. Gates on the rounded deviation, the
    // same value that gets reported. Overwrites rule 1.
    if let Some(deviation) = derived.range_deviation[eval] {
        let deviation = round_to(deviation, 2);
        if deviation.abs() >= VSA_DEVIATION_MIN && vo > params.thresholds.vsa_vo {
            let mut extra = BTreeMap::new();
            extra.insert("vsa_value".to_string(), deviation);
            detected = Some((SignalType::VolumeSpikeAdjusted, extra));
        }
    }

    // Rule 3: volume-spike. Overwrites rules 1 and 2.
    if vo > params.thresholds.spike_vo {
        let delta_fires = match params.thresholds.spike_delta {
            Some(threshold) => delta.is_some_and(|d| d.abs() > threshold),
            None => true,
        };
        if delta_fires {
            if eval == 0 {
                return Err(ScanError::Classification {
                    message: "volume-spike needs a candle before the evaluation index".to_string(),
                });
            }
            let prev = &series.candles()[eval - 1];
            let mut extra = BTreeMap::new();
            extra.insert(
                "prev_percent_change".to_string(),
                round_to(prev.percent_change(), 2),
            );
            detected = Some((SignalType::VolumeSpike, extra));
        }
    }

    Ok(detected.map(|(signal_type, extra)| Signal {
        id: None,
        signal_type,
        instrument: series.instrument().to_string(),
        timeframe: series.timeframe(),
        evaluation_time: candle.open_time,
        volume_oscillator: round_to(vo, 2),
        percent_change: round_to(candle.percent_change(), 2),
        delta: delta.map(|d| round_to(d, 2)),
        extra,
        created_at: Utc::now(),
    }))
}
