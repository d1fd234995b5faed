//! Shared data model for candlescan services
//!
//! Everything downstream of the exchange APIs works in terms of these types:
//! validated [`CandleSeries`] as the common input to every indicator, and
//! [`Signal`] as the record handed to persistence and notification sinks.
//! No I/O lives here.

pub mod candle;
pub mod signal;
pub mod timeframe;

pub use candle::{Candle, CandleSeries, SeriesError, MIN_SERIES_LEN};
pub use signal::{Signal, SignalType};
pub use timeframe::Timeframe;
