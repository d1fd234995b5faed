//! OHLCV candles and the validated series every indicator consumes

use crate::timeframe::Timeframe;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Minimum series length for any derived computation.
pub const MIN_SERIES_LEN: usize = 2;

#[derive(Debug, Error)]
pub enum SeriesError {
    #[error("insufficient history: got {got} candles, need at least {need}")]
    InsufficientHistory { got: usize, need: usize },

    #[error("candles out of order at index {index}")]
    OutOfOrder { index: usize },

    #[error("duplicate open time {open_time} at index {index}")]
    DuplicateTimestamp { index: usize, open_time: i64 },
}

/// One OHLCV record for a fixed time bucket. Immutable once fetched.
///
/// `taker_buy_volume` is the taker-buy base volume where the venue reports
/// it; venues without taker flow (the secondary integration) leave it `None`
/// and the delta indicator stays undefined for their series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Bucket open time, milliseconds since the Unix epoch.
    pub open_time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub taker_buy_volume: Option<f64>,
}

impl Candle {
    /// High-low range of the candle.
    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    /// Relative body change, `(close - open) / close * 100`.
    ///
    /// A zero close (degenerate test data) yields 0 rather than infinity.
    pub fn percent_change(&self) -> f64 {
        if self.close == 0.0 {
            0.0
        } else {
            (self.close - self.open) / self.close * 100.0
        }
    }
}

/// Time-ordered candles for one `(instrument, timeframe)` pair.
///
/// Construction validates ordering, uniqueness of open times and the
/// 2-candle minimum, so downstream code never re-checks those invariants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandleSeries {
    instrument: String,
    timeframe: Timeframe,
    candles: Vec<Candle>,
}

impl CandleSeries {
    pub fn new(
        instrument: impl Into<String>,
        timeframe: Timeframe,
        candles: Vec<Candle>,
    ) -> Result<Self, SeriesError> {
        if candles.len() < MIN_SERIES_LEN {
            return Err(SeriesError::InsufficientHistory {
                got: candles.len(),
                need: MIN_SERIES_LEN,
            });
        }

        for i in 1..candles.len() {
            use std::cmp::Ordering::*;
            match candles[i].open_time.cmp(&candles[i - 1].open_time) {
                Less => return Err(SeriesError::OutOfOrder { index: i }),
                Equal => {
                    return Err(SeriesError::DuplicateTimestamp {
                        index: i,
                        open_time: candles[i].open_time,
                    })
                }
                Greater => {}
            }
        }

        Ok(Self {
            instrument: instrument.into(),
            timeframe,
            candles,
        })
    }

    pub fn instrument(&self) -> &str {
        &self.instrument
    }

    pub fn timeframe(&self) -> Timeframe {
        self.timeframe
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    /// Always false: construction rejects empty series.
    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Candle> {
        self.candles.get(index)
    }

    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    pub fn opens(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.open).collect()
    }

    pub fn highs(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.high).collect()
    }

    pub fn lows(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.low).collect()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.close).collect()
    }

    pub fn volumes(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.volume).collect()
    }

    /// Taker-buy column, present only when every candle reports it.
    pub fn taker_buy_volumes(&self) -> Option<Vec<f64>> {
        self.candles.iter().map(|c| c.taker_buy_volume).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candle(open_time: i64) -> Candle {
        Candle {
            open_time,
            open: 10.0,
            high: 12.0,
            low: 9.0,
            close: 11.0,
            volume: 100.0,
            taker_buy_volume: Some(60.0),
        }
    }

    #[test]
    fn rejects_single_candle() {
        let err = CandleSeries::new("BTCUSDT", Timeframe::H1, vec![candle(0)]).unwrap_err();
        assert!(matches!(
            err,
            SeriesError::InsufficientHistory { got: 1, need: 2 }
        ));
    }

    #[test]
    fn rejects_out_of_order_and_duplicate_timestamps() {
        let err =
            CandleSeries::new("BTCUSDT", Timeframe::H1, vec![candle(100), candle(50)]).unwrap_err();
        assert!(matches!(err, SeriesError::OutOfOrder { index: 1 }));

        let err = CandleSeries::new("BTCUSDT", Timeframe::H1, vec![candle(100), candle(100)])
            .unwrap_err();
        assert!(matches!(err, SeriesError::DuplicateTimestamp { .. }));
    }

    #[test]
    fn taker_buy_column_requires_every_candle() {
        let mut second = candle(2);
        second.taker_buy_volume = None;
        let series = CandleSeries::new("BTCUSDT", Timeframe::H1, vec![candle(1), second]).unwrap();
        assert_eq!(series.taker_buy_volumes(), None);
    }

    #[test]
    fn percent_change_is_zero_for_flat_candle() {
        let c = Candle {
            open_time: 0,
            open: 10.0,
            high: 10.0,
            low: 10.0,
            close: 10.0,
            volume: 0.0,
            taker_buy_volume: Some(0.0),
        };
        assert_eq!(c.percent_change(), 0.0);
    }
}
