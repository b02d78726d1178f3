use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::config::PoolConfig;
use crate::error::Result;
use crate::ledger::{LedgerBatch, LedgerFactory, LedgerOp, LedgerStore};

#[derive(Debug, Default)]
struct Inner {
    hashes: HashMap<String, HashMap<String, f64>>,
    series: HashMap<String, Vec<(i64, String)>>,
}

/// In-memory ledger used by tests and local runs without a Redis instance.
///
/// One mutex guards both maps, so a committed batch is observed in full or
/// not at all, matching the atomicity contract of the Redis backend.
#[derive(Debug, Default, Clone)]
pub struct MemoryLedger {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hash_field(&self, key: &str, field: &str) -> Option<f64> {
        let inner = self.inner.lock().expect("memory ledger lock poisoned");
        inner.hashes.get(key).and_then(|h| h.get(field)).copied()
    }

    pub fn series_len(&self, key: &str) -> usize {
        let inner = self.inner.lock().expect("memory ledger lock poisoned");
        inner.series.get(key).map(|s| s.len()).unwrap_or(0)
    }

    pub fn series_entries(&self, key: &str) -> Vec<(i64, String)> {
        let inner = self.inner.lock().expect("memory ledger lock poisoned");
        inner.series.get(key).cloned().unwrap_or_default()
    }
}

#[async_trait]
impl LedgerStore for MemoryLedger {
    async fn commit(&self, batch: LedgerBatch) -> Result<()> {
        let mut inner = self.inner.lock().expect("memory ledger lock poisoned");
        for op in batch.ops() {
            match op {
                LedgerOp::HashIncrFloat { key, field, by } => {
                    *inner
                        .hashes
                        .entry(key.clone())
                        .or_default()
                        .entry(field.clone())
                        .or_default() += by;
                }
                LedgerOp::HashIncr { key, field, by } => {
                    *inner
                        .hashes
                        .entry(key.clone())
                        .or_default()
                        .entry(field.clone())
                        .or_default() += *by as f64;
                }
                LedgerOp::TimeSeriesAdd { key, score, member } => {
                    inner
                        .series
                        .entry(key.clone())
                        .or_default()
                        .push((*score, member.clone()));
                }
            }
        }
        Ok(())
    }
}

/// Hands every pool the same shared in-memory ledger, so tests can inspect
/// all namespaces through one handle.
#[derive(Debug, Default, Clone)]
pub struct MemoryLedgerFactory {
    ledger: MemoryLedger,
}

impl MemoryLedgerFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ledger(&self) -> MemoryLedger {
        self.ledger.clone()
    }
}

#[async_trait]
impl LedgerFactory for MemoryLedgerFactory {
    async fn open(&self, _pool: &PoolConfig) -> Result<Arc<dyn LedgerStore>> {
        Ok(Arc::new(self.ledger.clone()))
    }
}
