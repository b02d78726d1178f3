pub mod memory;
pub mod redis;

pub use memory::{MemoryLedger, MemoryLedgerFactory};
pub use redis::{RedisLedger, RedisLedgerFactory};

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::config::PoolConfig;
use crate::error::Result;

/// One mutation against the persisted ledger key namespace.
#[derive(Debug, Clone, PartialEq)]
pub enum LedgerOp {
    /// Increment a float-valued hash field (`HINCRBYFLOAT`).
    HashIncrFloat { key: String, field: String, by: f64 },
    /// Increment an integer-valued hash field (`HINCRBY`).
    HashIncr { key: String, field: String, by: i64 },
    /// Append to a time-ordered set (`ZADD`). The member carries its own
    /// uniqueness (millisecond timestamp suffix) so entries never overwrite.
    TimeSeriesAdd {
        key: String,
        score: i64,
        member: String,
    },
}

impl fmt::Display for LedgerOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LedgerOp::HashIncrFloat { key, field, by } => {
                write!(f, "hincrbyfloat {key} {field} {by}")
            }
            LedgerOp::HashIncr { key, field, by } => write!(f, "hincrby {key} {field} {by}"),
            LedgerOp::TimeSeriesAdd { key, score, member } => {
                write!(f, "zadd {key} {score} {member}")
            }
        }
    }
}

/// The full mutation set for one share/block event.
///
/// Either every op lands or none do — a torn update would corrupt the payout
/// ledger.
#[derive(Debug, Clone, Default)]
pub struct LedgerBatch {
    ops: Vec<LedgerOp>,
}

impl LedgerBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hash_incr_float(&mut self, key: impl Into<String>, field: impl Into<String>, by: f64) {
        self.ops.push(LedgerOp::HashIncrFloat {
            key: key.into(),
            field: field.into(),
            by,
        });
    }

    pub fn hash_incr(&mut self, key: impl Into<String>, field: impl Into<String>, by: i64) {
        self.ops.push(LedgerOp::HashIncr {
            key: key.into(),
            field: field.into(),
            by,
        });
    }

    pub fn time_series_add(&mut self, key: impl Into<String>, score: i64, member: String) {
        self.ops.push(LedgerOp::TimeSeriesAdd {
            key: key.into(),
            score,
            member,
        });
    }

    pub fn ops(&self) -> &[LedgerOp] {
        &self.ops
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Render the batch for failure logs.
    pub fn describe(&self) -> String {
        self.ops
            .iter()
            .map(|op| op.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Storage boundary for the accounting engine.
///
/// A commit is all-or-nothing; callers treat a failed commit as a lost event
/// rather than retrying, since retrying a partially-unknown-state financial
/// mutation risks double-credit.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn commit(&self, batch: LedgerBatch) -> Result<()>;
}

/// Opens one long-lived ledger connection per worker per coin.
#[async_trait]
pub trait LedgerFactory: Send + Sync {
    async fn open(&self, pool: &PoolConfig) -> Result<Arc<dyn LedgerStore>>;
}
