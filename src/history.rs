//! history.rs: append-only log of price snapshots.
//!
//! [`HistoryStore`] is the only point of coordination between ticks. Two
//! backends ship with the crate: a bounded in-memory log and a JSON-lines file.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::io::AsyncWriteExt;

use crate::config::TrackerConfig;
use crate::quote::PriceSnapshotRecord;

#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Append one record. Records are never mutated afterwards.
    async fn append(&self, record: &PriceSnapshotRecord) -> Result<()>;

    /// Records with `timestamp >= since`, ascending by timestamp.
    async fn query(&self, since: DateTime<Utc>) -> Result<Vec<PriceSnapshotRecord>>;
}

fn select_since(
    rows: impl IntoIterator<Item = PriceSnapshotRecord>,
    since: DateTime<Utc>,
) -> Vec<PriceSnapshotRecord> {
    let mut out: Vec<PriceSnapshotRecord> =
        rows.into_iter().filter(|r| r.timestamp >= since).collect();
    out.sort_by_key(|r| r.timestamp);
    out
}

/// Bounded in-memory log; the oldest rows are dropped past `cap`.
#[derive(Debug)]
pub struct InMemoryHistory {
    inner: Mutex<Vec<PriceSnapshotRecord>>,
    cap: usize,
}

impl InMemoryHistory {
    pub fn with_capacity(cap: usize) -> Self {
        let cap = cap.max(1);
        Self {
            inner: Mutex::new(Vec::with_capacity(cap.min(10_000))),
            cap,
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().map(|v| v.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistory {
    async fn append(&self, record: &PriceSnapshotRecord) -> Result<()> {
        let mut v = self
            .inner
            .lock()
            .map_err(|_| anyhow!("history mutex poisoned"))?;
        v.push(record.clone());
        if v.len() > self.cap {
            let excess = v.len() - self.cap;
            v.drain(0..excess);
        }
        Ok(())
    }

    async fn query(&self, since: DateTime<Utc>) -> Result<Vec<PriceSnapshotRecord>> {
        let v = self
            .inner
            .lock()
            .map_err(|_| anyhow!("history mutex poisoned"))?;
        Ok(select_since(v.iter().cloned(), since))
    }
}

/// Durable log: one JSON record per line, appended in call order.
#[derive(Debug)]
pub struct JsonlHistory {
    path: PathBuf,
    write_lock: tokio::sync::Mutex<()>,
}

impl JsonlHistory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl HistoryStore for JsonlHistory {
    async fn append(&self, record: &PriceSnapshotRecord) -> Result<()> {
        let mut line = serde_json::to_string(record).context("serializing snapshot")?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir)
                .await
                .with_context(|| format!("creating {}", dir.display()))?;
        }
        let mut f = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .with_context(|| format!("opening {}", self.path.display()))?;
        f.write_all(line.as_bytes())
            .await
            .with_context(|| format!("appending to {}", self.path.display()))?;
        f.flush().await?;
        Ok(())
    }

    async fn query(&self, since: DateTime<Utc>) -> Result<Vec<PriceSnapshotRecord>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(e).with_context(|| format!("reading {}", self.path.display()))
            }
        };

        let rows = content
            .lines()
            .enumerate()
            .filter(|(_, l)| !l.trim().is_empty())
            .filter_map(|(n, l)| match serde_json::from_str::<PriceSnapshotRecord>(l) {
                Ok(r) => Some(r),
                Err(e) => {
                    tracing::warn!(line = n + 1, error = %e, path = %self.path.display(), "skipping malformed history line");
                    None
                }
            });
        Ok(select_since(rows, since))
    }
}

/// File-backed store when `history_path` is set, in-memory otherwise.
pub fn build_store(cfg: &TrackerConfig) -> Arc<dyn HistoryStore> {
    match &cfg.history_path {
        Some(p) => {
            tracing::info!(path = %p.display(), "history: json-lines file");
            Arc::new(JsonlHistory::new(p.clone()))
        }
        None => {
            tracing::info!(cap = cfg.history_capacity, "history: in-memory");
            Arc::new(InMemoryHistory::with_capacity(cfg.history_capacity))
        }
    }
}
