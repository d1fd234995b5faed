//! Candle acquisition
//!
//! One trait, one implementation per venue. Sources return raw candle
//! vectors; series validation happens in the pipeline so every venue goes
//! through the same ordering and length checks.

use crate::error::Result;
use async_trait::async_trait;
use candlescan_types::{Candle, Timeframe};

mod binance;
mod moex;

pub use binance::BinanceSource;
pub use moex::MoexSource;

#[async_trait]
pub trait CandleSource: Send + Sync {
    /// Fetch up to `limit` of the most recent candles for one instrument,
    /// oldest first. The final candle may still be forming.
    async fn fetch(&self, instrument: &str, timeframe: Timeframe, limit: usize)
        -> Result<Vec<Candle>>;
}

/// Map a transport-level failure onto the retry taxonomy. Connection and
/// timeout failures are transient; anything else is surfaced as-is.
pub(crate) fn classify_transport(err: reqwest::Error) -> crate::error::ScanError {
    if err.is_connect() || err.is_timeout() {
        crate::error::ScanError::RemoteUnavailable {
            message: err.to_string(),
        }
    } else {
        crate::error::ScanError::Http(err)
    }
}

/// Map a non-success HTTP status onto the retry taxonomy. Server errors and
/// throttling are transient; client errors mean the request itself is wrong.
pub(crate) fn classify_status(
    status: reqwest::StatusCode,
    url: &str,
) -> crate::error::ScanError {
    if status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        crate::error::ScanError::RemoteUnavailable {
            message: format!("{url} returned {status}"),
        }
    } else {
        crate::error::ScanError::MalformedPayload {
            message: format!("{url} returned {status}"),
        }
    }
}
