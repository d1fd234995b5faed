//! Scanner configuration
//!
//! Loaded once at startup from a TOML file (or defaults) and handed to the
//! pipelines pre-validated. Threshold constants live here, not in the
//! classifier, so both venue integrations share one classifier
//! implementation with different numbers.

use crate::error::{Result, ScanError};
use candlescan_types::Timeframe;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Threshold set for one pipeline/timeframe combination.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Volume oscillator floor for the flat-and-volume rule.
    pub flat_vo: f64,
    /// Volume oscillator floor for the volume-spike-adjusted rule.
    pub vsa_vo: f64,
    /// Volume oscillator floor for the volume-spike rule.
    pub spike_vo: f64,
    /// Absolute normalized-delta floor for the volume-spike rule; `None`
    /// disables the delta condition (venues without taker flow).
    pub spike_delta: Option<f64>,
}

impl Default for Thresholds {
    fn default() -> Self {
        // Primary pipeline constants.
        Self {
            flat_vo: 10.0,
            vsa_vo: 20.0,
            spike_vo: 20.0,
            spike_delta: Some(2.8),
        }
    }
}

impl Thresholds {
    /// Secondary pipeline, hourly candles.
    pub const fn moex_hourly() -> Self {
        Self {
            flat_vo: 30.0,
            vsa_vo: 30.0,
            spike_vo: 50.0,
            spike_delta: None,
        }
    }

    /// Secondary pipeline, everything but hourly.
    pub const fn moex_default() -> Self {
        Self {
            flat_vo: 10.0,
            vsa_vo: 20.0,
            spike_vo: 20.0,
            spike_delta: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BinanceConfig {
    pub base_url: String,
    pub pairs: Vec<String>,
    /// Timeframes driven by the watch loop.
    pub timeframes: Vec<Timeframe>,
    pub thresholds: Thresholds,
}

impl Default for BinanceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.binance.com".to_string(),
            pairs: vec![
                "BTCUSDT".to_string(),
                "ETHUSDT".to_string(),
                "SOLUSDT".to_string(),
                "XRPUSDT".to_string(),
                "DOGEUSDT".to_string(),
                "ADAUSDT".to_string(),
            ],
            timeframes: vec![Timeframe::H1, Timeframe::H4, Timeframe::D1],
            thresholds: Thresholds::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MoexConfig {
    pub base_url: String,
    /// Trading board the securities are quoted on.
    pub board: String,
    pub securities: Vec<String>,
    pub timeframes: Vec<Timeframe>,
    /// How far back the candle request reaches.
    pub history_days: u32,
    pub hourly_thresholds: Thresholds,
    pub thresholds: Thresholds,
}

impl Default for MoexConfig {
    fn default() -> Self {
        Self {
            base_url: "https://iss.moex.com".to_string(),
            board: "TQBR".to_string(),
            securities: vec![
                "SBER".to_string(),
                "GAZP".to_string(),
                "LKOH".to_string(),
                "ROSN".to_string(),
            ],
            timeframes: vec![Timeframe::H1, Timeframe::D1],
            history_days: 50,
            hourly_thresholds: Thresholds::moex_hourly(),
            thresholds: Thresholds::moex_default(),
        }
    }
}

impl MoexConfig {
    /// Hourly candles use their own, stricter thresholds.
    pub fn thresholds_for(&self, timeframe: Timeframe) -> Thresholds {
        if timeframe == Timeframe::H1 {
            self.hourly_thresholds
        } else {
            self.thresholds
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_ids: Vec<i64>,
    /// Separate bot/recipients for the secondary pipeline; falls back to
    /// the primary bot when empty.
    pub moex_bot_token: String,
    pub moex_chat_ids: Vec<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    pub binance: BinanceConfig,
    pub moex: MoexConfig,
    pub telegram: TelegramConfig,
    /// Append-only signal log.
    pub storage_path: PathBuf,
    /// Candles requested per instrument per pass.
    pub candle_limit: usize,
    /// Cap on overlapping pipeline runs in watch mode.
    pub max_concurrent_runs: usize,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            binance: BinanceConfig::default(),
            moex: MoexConfig::default(),
            telegram: TelegramConfig::default(),
            storage_path: PathBuf::from("signals.jsonl"),
            candle_limit: 50,
            max_concurrent_runs: 3,
        }
    }
}

impl ScannerConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| ScanError::Configuration {
            message: format!("cannot read {}: {e}", path.display()),
        })?;
        let config: Self = toml::from_str(&raw).map_err(|e| ScanError::Configuration {
            message: format!("cannot parse {}: {e}", path.display()),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.candle_limit < candlescan_types::MIN_SERIES_LEN {
            return Err(ScanError::Configuration {
                message: format!("candle_limit must be at least 2, got {}", self.candle_limit),
            });
        }
        if self.max_concurrent_runs == 0 {
            return Err(ScanError::Configuration {
                message: "max_concurrent_runs must be at least 1".to_string(),
            });
        }
        if let Some(tf) = self
            .moex
            .timeframes
            .iter()
            .find(|tf| tf.moex_interval().is_none())
        {
            return Err(ScanError::Configuration {
                message: format!("timeframe {tf} is not served by the secondary venue"),
            });
        }
        Ok(())
    }
}
