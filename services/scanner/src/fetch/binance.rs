//! Binance spot klines endpoint
//!
//! `GET /api/v3/klines` returns a JSON array of rows where every numeric
//! field except the timestamps is a decimal string. Only the fields the
//! indicator engine consumes are parsed; the rest of the row is ignored.

use super::{classify_status, classify_transport, CandleSource};
use crate::error::{Result, ScanError};
use async_trait::async_trait;
use candlescan_types::{Candle, Timeframe};
use serde_json::Value;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const TAKER_BUY_INDEX: usize = 9;

pub struct BinanceSource {
    client: reqwest::Client,
    base_url: String,
}

impl BinanceSource {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl CandleSource for BinanceSource {
    async fn fetch(
        &self,
        instrument: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<Vec<Candle>> {
        let url = format!("{}/api/v3/klines", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("symbol", instrument),
                ("interval", timeframe.binance_code()),
                ("limit", &limit.to_string()),
            ])
            .send()
            .await
            .map_err(classify_transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(classify_status(status, &url));
        }

        let rows: Vec<Vec<Value>> = response.json().await.map_err(|e| {
            ScanError::MalformedPayload {
                message: format!("{instrument} klines: {e}"),
            }
        })?;
        rows.iter().map(|row| parse_kline_row(row)).collect()
    }
}

fn field_f64(row: &[Value], index: usize) -> Result<f64> {
    let value = row.get(index).ok_or_else(|| ScanError::MalformedPayload {
        message: format!("kline row is missing field {index}"),
    })?;
    value
        .as_str()
        .and_then(|s| s.parse::<f64>().ok())
        .or_else(|| value.as_f64())
        .ok_or_else(|| ScanError::MalformedPayload {
            message: format!("kline field {index} is not numeric: {value}"),
        })
}

fn parse_kline_row(row: &[Value]) -> Result<Candle> {
    let open_time = row
        .first()
        .and_then(Value::as_i64)
        .ok_or_else(|| ScanError::MalformedPayload {
            message: "kline row has no open time".to_string(),
        })?;
    Ok(Candle {
        open_time,
        open: field_f64(row, 1)?,
        high: field_f64(row, 2)?,
        low: field_f64(row, 3)?,
        close: field_f64(row, 4)?,
        volume: field_f64(row, 5)?,
        taker_buy_volume: Some(field_f64(row, TAKER_BUY_INDEX)?),
    })
}
