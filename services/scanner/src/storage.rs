//! Signal persistence
//!
//! Production writes an append-only JSON-lines log; tests use the in-memory
//! store. Both hand back the assigned row id so callers can log it.

use crate::error::{Result, ScanError};
use async_trait::async_trait;
use candlescan_types::Signal;
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

#[async_trait]
pub trait SignalStore: Send + Sync {
    /// Persist one signal, returning its assigned id.
    async fn insert(&self, signal: &Signal, exchange: &str) -> Result<i64>;
}

/// One persisted row. The signal fields are flattened so the log stays
/// greppable by instrument and type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredSignal {
    pub id: i64,
    pub exchange: String,
    #[serde(flatten)]
    pub signal: Signal,
}

/// Append-only JSON-lines log on local disk.
pub struct JsonlStore {
    path: PathBuf,
    next_id: Mutex<i64>,
}

impl JsonlStore {
    /// Open (or create) the log. Ids continue after any existing rows.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let existing = match std::fs::read_to_string(&path) {
            Ok(contents) => contents.lines().filter(|l| !l.trim().is_empty()).count() as i64,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => 0,
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            path,
            next_id: Mutex::new(existing + 1),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SignalStore for JsonlStore {
    async fn insert(&self, signal: &Signal, exchange: &str) -> Result<i64> {
        let mut next_id = self.next_id.lock().await;
        let row = StoredSignal {
            id: *next_id,
            exchange: exchange.to_string(),
            signal: signal.clone(),
        };
        let line = serde_json::to_string(&row).map_err(|e| ScanError::Storage {
            message: format!("cannot serialize signal: {e}"),
        })?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| ScanError::Storage {
                message: format!("cannot open {}: {e}", self.path.display()),
            })?;
        writeln!(file, "{line}").map_err(|e| ScanError::Storage {
            message: format!("cannot append to {}: {e}", self.path.display()),
        })?;
        let id = *next_id;
        *next_id += 1;
        Ok(id)
    }
}

/// In-memory store for tests and dry runs.
#[derive(Default)]
pub struct MemoryStore {
    rows: Mutex<Vec<StoredSignal>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn rows(&self) -> Vec<StoredSignal> {
        self.rows.lock().await.clone()
    }
}

#[async_trait]
impl SignalStore for MemoryStore {
    async fn insert(&self, signal: &Signal, exchange: &str) -> Result<i64> {
        let mut rows = self.rows.lock().await;
        let id = rows.len() as i64 + 1;
        rows.push(StoredSignal {
            id,
            exchange: exchange.to_string(),
            signal: signal.clone(),
        });
        Ok(id)
    }
}
