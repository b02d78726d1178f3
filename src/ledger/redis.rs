use std::sync::Arc;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{ConnectionAddr, ConnectionInfo, RedisConnectionInfo};
use tracing::debug;

use crate::config::{PoolConfig, RedisConfig};
use crate::error::{PortalError, Result};
use crate::ledger::{LedgerBatch, LedgerFactory, LedgerOp, LedgerStore};

/// Redis-backed ledger store.
///
/// One multiplexed connection per store; each batch commits through an
/// atomic `MULTI`/`EXEC` pipeline so no batch observes a partial update from
/// another.
#[derive(Debug, Clone)]
pub struct RedisLedger {
    connection: MultiplexedConnection,
}

impl RedisLedger {
    pub async fn connect(config: &RedisConfig) -> Result<Self> {
        let info = ConnectionInfo {
            addr: ConnectionAddr::Tcp(config.host.clone(), config.port),
            redis: RedisConnectionInfo {
                db: config.db,
                password: config.password.clone(),
                ..Default::default()
            },
        };

        let client = redis::Client::open(info).map_err(|e| PortalError::Ledger {
            message: format!("failed to open redis client: {e}"),
            context: None,
        })?;
        let connection = client
            .get_multiplexed_tokio_connection()
            .await
            .map_err(|e| PortalError::Ledger {
                message: format!(
                    "failed to connect to redis at {}:{}: {e}",
                    config.host, config.port
                ),
                context: None,
            })?;

        debug!(host = %config.host, port = config.port, db = config.db, "ledger connection ready");

        Ok(Self { connection })
    }
}

#[async_trait]
impl LedgerStore for RedisLedger {
    async fn commit(&self, batch: LedgerBatch) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }

        let mut pipe = redis::pipe();
        pipe.atomic();
        for op in batch.ops() {
            match op {
                LedgerOp::HashIncrFloat { key, field, by } => {
                    pipe.cmd("HINCRBYFLOAT").arg(key).arg(field).arg(*by);
                }
                LedgerOp::HashIncr { key, field, by } => {
                    pipe.cmd("HINCRBY").arg(key).arg(field).arg(*by);
                }
                LedgerOp::TimeSeriesAdd { key, score, member } => {
                    pipe.cmd("ZADD").arg(key).arg(*score).arg(member);
                }
            }
        }

        let mut connection = self.connection.clone();
        let result: std::result::Result<(), redis::RedisError> =
            pipe.query_async(&mut connection).await;

        result.map_err(|e| PortalError::Ledger {
            message: format!("batch commit failed: {e}"),
            context: Some(batch.describe()),
        })
    }
}

/// Opens one Redis connection per pool, using the pool's own ledger
/// connection parameters.
#[derive(Debug, Default, Clone)]
pub struct RedisLedgerFactory;

impl RedisLedgerFactory {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl LedgerFactory for RedisLedgerFactory {
    async fn open(&self, pool: &PoolConfig) -> Result<Arc<dyn LedgerStore>> {
        Ok(Arc::new(RedisLedger::connect(&pool.redis).await?))
    }
}
