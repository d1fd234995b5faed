//! MOEX ISS board-candles endpoint
//!
//! ISS answers with a columns/data table instead of an object per candle,
//! so parsing resolves column positions by name first. Candle timestamps
//! come back as naive local datetime strings.

use super::{classify_status, classify_transport, CandleSource};
use crate::error::{Result, ScanError};
use async_trait::async_trait;
use candlescan_types::{Candle, Timeframe};
use chrono::{Duration as ChronoDuration, NaiveDateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const BEGIN_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub struct MoexSource {
    client: reqwest::Client,
    base_url: String,
    board: String,
    history_days: u32,
}

#[derive(Debug, Deserialize)]
struct IssResponse {
    candles: IssTable,
}

#[derive(Debug, Deserialize)]
struct IssTable {
    columns: Vec<String>,
    data: Vec<Vec<Value>>,
}

impl MoexSource {
    pub fn new(
        base_url: impl Into<String>,
        board: impl Into<String>,
        history_days: u32,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            board: board.into(),
            history_days,
        })
    }
}

#[async_trait]
impl CandleSource for MoexSource {
    async fn fetch(
        &self,
        instrument: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<Vec<Candle>> {
        let interval = timeframe
            .moex_interval()
            .ok_or_else(|| ScanError::Configuration {
                message: format!("timeframe {timeframe} is not served by ISS"),
            })?;
        let from = (Utc::now() - ChronoDuration::days(self.history_days as i64))
            .format("%Y-%m-%d")
            .to_string();
        let url = format!(
            "{}/iss/engines/stock/markets/shares/boards/{}/securities/{}/candles.json",
            self.base_url, self.board, instrument
        );
        let response = self
            .client
            .get(&url)
            .query(&[
                ("interval", interval.to_string().as_str()),
                ("from", from.as_str()),
                ("iss.only", "candles"),
            ])
            .send()
            .await
            .map_err(classify_transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(classify_status(status, &url));
        }

        let table: IssResponse = response.json().await.map_err(|e| {
            ScanError::MalformedPayload {
                message: format!("{instrument} candles: {e}"),
            }
        })?;
        let mut candles = parse_table(&table.candles)?;
        if candles.len() > limit {
            candles.drain(..candles.len() - limit);
        }
        Ok(candles)
    }
}

fn column_index(table: &IssTable, name: &str) -> Result<usize> {
    table
        .columns
        .iter()
        .position(|c| c == name)
        .ok_or_else(|| ScanError::MalformedPayload {
            message: format!("ISS table has no '{name}' column"),
        })
}

fn cell_f64(row: &[Value], index: usize) -> Result<f64> {
    row.get(index)
        .and_then(Value::as_f64)
        .ok_or_else(|| ScanError::MalformedPayload {
            message: format!("ISS cell {index} is not numeric"),
        })
}

fn parse_table(table: &IssTable) -> Result<Vec<Candle>> {
    let open = column_index(table, "open")?;
    let close = column_index(table, "close")?;
    let high = column_index(table, "high")?;
    let low = column_index(table, "low")?;
    // Turnover in currency, not lots. The regression normalizes it away
    // so either unit works, but turnover matches the notification text.
    let value = column_index(table, "value")?;
    let begin = column_index(table, "begin")?;

    table
        .data
        .iter()
        .map(|row| {
            let raw_begin =
                row.get(begin)
                    .and_then(Value::as_str)
                    .ok_or_else(|| ScanError::MalformedPayload {
                        message: "ISS row has no 'begin' timestamp".to_string(),
                    })?;
            let begin_at = NaiveDateTime::parse_from_str(raw_begin, BEGIN_FORMAT).map_err(
                |e| ScanError::MalformedPayload {
                    message: format!("bad ISS timestamp '{raw_begin}': {e}"),
                },
            )?;
            Ok(Candle {
                open_time: begin_at.and_utc().timestamp_millis(),
                open: cell_f64(row, open)?,
                high: cell_f64(row, high)?,
                low: cell_f64(row, low)?,
                close: cell_f64(row, close)?,
                volume: cell_f64(row, value)?,
                taker_buy_volume: None,
            })
        })
        .collect()
}
