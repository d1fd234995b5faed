//! Signal notification
//!
//! Telegram is the production sink. Delivery is per-recipient: one chat
//! rejecting the message never blocks the others, and the pass only sees a
//! notification error when every recipient failed.

use crate::error::{Result, ScanError};
use async_trait::async_trait;
use candlescan_types::Signal;
use serde::Serialize;
use std::time::Duration;
use tracing::warn;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, signal: &Signal) -> Result<()>;
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: i64,
    text: &'a str,
}

pub struct TelegramNotifier {
    client: reqwest::Client,
    base_url: String,
    token: String,
    chat_ids: Vec<i64>,
}

impl TelegramNotifier {
    pub fn new(token: impl Into<String>, chat_ids: Vec<i64>) -> Result<Self> {
        Self::with_base_url("https://api.telegram.org", token, chat_ids)
    }

    pub fn with_base_url(
        base_url: impl Into<String>,
        token: impl Into<String>,
        chat_ids: Vec<i64>,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            token: token.into(),
            chat_ids,
        })
    }

    async fn send_to_chat(&self, chat_id: i64, text: &str) -> Result<()> {
        let url = format!("{}/bot{}/sendMessage", self.base_url, self.token);
        let response = self
            .client
            .post(&url)
            .json(&SendMessage { chat_id, text })
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ScanError::Notification {
                message: format!("sendMessage to {chat_id} returned {status}"),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, signal: &Signal) -> Result<()> {
        if self.chat_ids.is_empty() {
            return Ok(());
        }
        let text = signal.message();
        let mut delivered = 0usize;
        for &chat_id in &self.chat_ids {
            match self.send_to_chat(chat_id, &text).await {
                Ok(()) => delivered += 1,
                Err(e) => warn!(chat_id, error = %e, "telegram delivery failed"),
            }
        }
        if delivered == 0 {
            return Err(ScanError::Notification {
                message: format!("all {} telegram recipients failed", self.chat_ids.len()),
            });
        }
        Ok(())
    }
}

/// Sink that drops every message, for runs without a configured bot.
pub struct NullNotifier;

#[async_trait]
impl Notifier for NullNotifier {
    async fn send(&self, _signal: &Signal) -> Result<()> {
        Ok(())
    }
}
