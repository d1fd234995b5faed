//! Candlescan scanner service
//!
//! Polls exchange candle endpoints on a schedule, computes the indicator
//! set, classifies each `(instrument, timeframe)` window against threshold
//! rules and hands any detected signal to the persistence and notification
//! sinks. Failures are isolated per instrument: one broken instrument never
//! blocks the rest of a pass.

pub mod classify;
pub mod config;
pub mod error;
pub mod fetch;
pub mod notify;
pub mod pipeline;
pub mod storage;

pub use classify::{classify, ClassifierParams, Evaluation};
pub use config::{ScannerConfig, Thresholds};
pub use error::{Result, ScanError};
pub use pipeline::{run_pass, InstrumentReport, RunContext, StageOutcome};
