//! Candle timeframes and their per-venue wire codes

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Candle bucket size monitored by the pipeline.
///
/// Each venue speaks its own dialect: the primary venue takes interval
/// strings (`"1h"`, `"4h"`, `"1d"`), the secondary venue takes integer
/// interval codes (60 for hourly, 24 for daily) and has no 4-hour candles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "1h")]
    H1,
    #[serde(rename = "4h")]
    H4,
    #[serde(rename = "1d")]
    D1,
}

impl Timeframe {
    /// Interval string understood by the primary venue's klines endpoint.
    pub fn binance_code(&self) -> &'static str {
        match self {
            Timeframe::H1 => "1h",
            Timeframe::H4 => "4h",
            Timeframe::D1 => "1d",
        }
    }

    /// Interval code understood by the secondary venue's board-candles
    /// endpoint. `None` for timeframes the venue does not serve.
    pub fn moex_interval(&self) -> Option<u32> {
        match self {
            Timeframe::H1 => Some(60),
            Timeframe::H4 => None,
            Timeframe::D1 => Some(24),
        }
    }

    /// Build a timeframe back from a secondary-venue interval code.
    pub fn from_moex_interval(interval: u32) -> Option<Self> {
        match interval {
            60 => Some(Timeframe::H1),
            24 => Some(Timeframe::D1),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        self.binance_code()
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Timeframe {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1h" => Ok(Timeframe::H1),
            "4h" => Ok(Timeframe::H4),
            "1d" => Ok(Timeframe::D1),
            other => Err(format!("unknown timeframe '{other}', expected 1h, 4h or 1d")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_displays_round_trip() {
        for tf in [Timeframe::H1, Timeframe::H4, Timeframe::D1] {
            assert_eq!(tf.as_str().parse::<Timeframe>().unwrap(), tf);
        }
    }

    #[test]
    fn secondary_venue_has_no_four_hour_candles() {
        assert_eq!(Timeframe::H4.moex_interval(), None);
        assert_eq!(Timeframe::from_moex_interval(60), Some(Timeframe::H1));
        assert_eq!(Timeframe::from_moex_interval(24), Some(Timeframe::D1));
    }

    #[test]
    fn serde_uses_wire_codes() {
        let json = serde_json::to_string(&Timeframe::H4).unwrap();
        assert_eq!(json, "\"4h\"");
        let back: Timeframe = serde_json::from_str("\"1d\"").unwrap();
        assert_eq!(back, Timeframe::D1);
    }
}
