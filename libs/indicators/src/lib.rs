//! Pure indicator computation for candlescan
//!
//! No I/O, no side effects: candle columns in, derived series out. Every
//! output is aligned index-for-index with its input; indices without enough
//! history carry an explicit `None`, never a placeholder zero. All math runs
//! in full f64 precision; rounding happens downstream at the presentation
//! boundary, so recursive smoothing never compounds rounding error.

pub mod delta;
pub mod ema;
pub mod engine;
pub mod smi;
mod stats;
pub mod vsa;

pub use delta::normalized_delta;
pub use ema::{ema, volume_oscillator};
pub use engine::{DerivedSeries, SMI_FAST, SMI_SIGNAL, SMI_SLOW, VO_FAST_SPAN, VO_SLOW_SPAN, VSA_LOOKBACK};
pub use smi::smi_signal;
pub use vsa::{atr, range_deviation, rolling_median};
