//! One-pass computation of every derived series for a candle series

use crate::delta::normalized_delta;
use crate::ema::volume_oscillator;
use crate::smi::smi_signal;
use crate::vsa::range_deviation;
use candlescan_types::CandleSeries;

/// Volume oscillator fast EMA span.
pub const VO_FAST_SPAN: usize = 5;
/// Volume oscillator slow EMA span.
pub const VO_SLOW_SPAN: usize = 10;
/// SMI first smoothing span.
pub const SMI_FAST: usize = 5;
/// SMI second smoothing span.
pub const SMI_SLOW: usize = 20;
/// SMI signal-line span.
pub const SMI_SIGNAL: usize = 5;
/// Lookback for ATR, volume median and the regression window.
pub const VSA_LOOKBACK: usize = 14;

/// All derived series for one candle series, aligned index-for-index with
/// the candles. Entries with insufficient history are `None`.
#[derive(Debug, Clone)]
pub struct DerivedSeries {
    pub volume_oscillator: Vec<Option<f64>>,
    pub smi_signal: Vec<Option<f64>>,
    pub range_deviation: Vec<Option<f64>>,
    pub normalized_delta: Vec<Option<f64>>,
}

impl DerivedSeries {
    /// Compute every indicator for `series` in one pass.
    ///
    /// Each value at index `i` depends only on candles at indices `<= i`;
    /// the one exception is the delta z-score, whose mean/deviation are
    /// taken over the full series as fetched.
    pub fn compute(series: &CandleSeries) -> Self {
        let highs = series.highs();
        let lows = series.lows();
        let closes = series.closes();
        let volumes = series.volumes();

        let normalized_delta = match series.taker_buy_volumes() {
            Some(taker_buy) => normalized_delta(&volumes, &taker_buy),
            None => vec![None; series.len()],
        };

        Self {
            volume_oscillator: volume_oscillator(&volumes),
            smi_signal: smi_signal(&highs, &lows, &closes, SMI_FAST, SMI_SLOW, SMI_SIGNAL),
            range_deviation: range_deviation(&highs, &lows, &closes, &volumes, VSA_LOOKBACK),
            normalized_delta,
        }
    }

    pub fn len(&self) -> usize {
        self.volume_oscillator.len()
    }

    pub fn is_empty(&self) -> bool {
        self.volume_oscillator.is_empty()
    }
}
