pub mod normalize;
pub mod subsidy;

pub use normalize::{normalize_identity, resolve_worker, WorkerIdentity};
pub use subsidy::{block_subsidy, coin_subsidy};

use std::sync::Arc;

use chrono::Utc;
use tracing::{error, warn};

use crate::config::PoolConfig;
use crate::ledger::{LedgerBatch, LedgerStore};

/// One share/block outcome as reported by the protocol engine. Transient;
/// only its ledger effects are persisted.
#[derive(Debug, Clone)]
pub struct ShareEvent {
    pub valid_share: bool,
    pub valid_block: bool,
    /// Raw worker identity as submitted (wallet address, optionally
    /// `.label`-suffixed).
    pub worker: String,
    pub difficulty: f64,
    pub block_difficulty: f64,
    pub height: u64,
    pub block_hash: Option<String>,
    /// Ledger namespace the event is recorded under.
    pub coin: String,
    pub aux: bool,
}

/// Per-pool transactional ledger writer.
///
/// Converts share/block events into atomic mutation batches. Failures are
/// logged with full batch context and the event is dropped — event
/// processing must never block or break the protocol engine, and retrying a
/// mutation in unknown state risks double-credit.
pub struct ShareAccountant {
    pool: Arc<PoolConfig>,
    ledger: Arc<dyn LedgerStore>,
    fork_id: usize,
}

impl ShareAccountant {
    pub fn new(pool: Arc<PoolConfig>, ledger: Arc<dyn LedgerStore>, fork_id: usize) -> Self {
        Self {
            pool,
            ledger,
            fork_id,
        }
    }

    /// Apply the ledger mutations for one share event.
    pub async fn record_share(&self, event: ShareEvent) {
        let worker = resolve_worker(&event.worker, &self.pool);
        let coin = &event.coin;
        let mut batch = LedgerBatch::new();

        if event.aux {
            // Merged-mining namespaces only track block outcomes; the
            // proof-of-work is already accounted under the primary coin.
            self.push_block_ops(&mut batch, &event, coin, &worker.address);
            self.commit(batch, coin).await;
            return;
        }

        if event.valid_share {
            batch.hash_incr_float(
                format!("{coin}:shares:Today"),
                &worker.address,
                event.difficulty,
            );
            batch.hash_incr(format!("{coin}:stats"), "validShares", 1);

            if event.block_difficulty > 0.0 {
                let subsidy = coin_subsidy(&self.pool.coin, event.height) as f64;
                let reward = subsidy * event.difficulty / event.block_difficulty;
                batch.hash_incr_float(format!("{coin}:PPS_balances"), &worker.address, reward);
                batch.hash_incr_float(format!("{coin}:shifts:Today"), &worker.address, reward);
            } else {
                warn!(
                    fork_id = self.fork_id,
                    coin = %coin,
                    worker = %worker.full(),
                    "non-positive block difficulty, skipping reward"
                );
            }
        } else {
            batch.hash_incr(format!("{coin}:stats"), "invalidShares", 1);
        }

        // One sample per share, valid or not; signed difficulty lets
        // hashrate derivation discount rejected work. The millisecond suffix
        // keeps members unique so nothing is ever overwritten.
        let now = Utc::now();
        let millis = now.timestamp_millis();
        let signed = if event.valid_share {
            event.difficulty
        } else {
            -event.difficulty
        };
        batch.time_series_add(
            format!("{coin}:hashrate"),
            now.timestamp(),
            format!("{signed}:{}:{millis}", worker.full()),
        );

        self.push_block_ops(&mut batch, &event, coin, &worker.address);
        self.commit(batch, coin).await;
    }

    /// Apply the ledger mutations for an auxiliary block outcome.
    pub async fn record_aux_block(&self, coin: &str, valid: bool, hash: Option<&str>) {
        let mut batch = LedgerBatch::new();
        if valid {
            batch.hash_incr(format!("{coin}:stats"), "validBlocks", 1);
        } else if hash.is_some() {
            batch.hash_incr(format!("{coin}:stats"), "invalidBlocks", 1);
        }
        self.commit(batch, coin).await;
    }

    /// Block-outcome counters, applied in addition to share handling. A hash
    /// without block validity means the daemon rejected a candidate block.
    fn push_block_ops(&self, batch: &mut LedgerBatch, event: &ShareEvent, coin: &str, addr: &str) {
        if event.valid_block {
            batch.hash_incr(format!("{coin}:block_finders"), addr, 1);
            batch.hash_incr(format!("{coin}:stats"), "validBlocks", 1);
        } else if event.block_hash.is_some() {
            batch.hash_incr(format!("{coin}:stats"), "invalidBlocks", 1);
        }
    }

    async fn commit(&self, batch: LedgerBatch, coin: &str) {
        if batch.is_empty() {
            return;
        }
        let description = batch.describe();
        if let Err(e) = self.ledger.commit(batch).await {
            // The event is lost by design: no retry.
            error!(
                fork_id = self.fork_id,
                coin = %coin,
                error = %e,
                batch = %description,
                "ledger batch commit failed, dropping event"
            );
        }
    }
}
