//! Placeholder engine for deployments where the real stratum engine is not
//! linked in yet. Emits no events; control calls are logged and dropped.

use std::net::IpAddr;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::info;

use crate::config::PoolConfig;
use crate::engine::{Authorizer, EngineEvent, EngineFactory, PoolEngine};

#[derive(Debug)]
struct IdleEngine {
    coin: String,
    // Keeps the event stream open for the worker's lifetime.
    _sender: mpsc::Sender<EngineEvent>,
}

#[async_trait]
impl PoolEngine for IdleEngine {
    fn coin(&self) -> &str {
        &self.coin
    }

    async fn ban_ip(&self, ip: IpAddr) {
        info!(coin = %self.coin, %ip, "idle engine ignoring ban");
    }

    async fn block_notify(&self, hash: &str) {
        info!(coin = %self.coin, hash, "idle engine ignoring block notification");
    }
}

#[derive(Debug, Default, Clone)]
pub struct IdleEngineFactory;

impl EngineFactory for IdleEngineFactory {
    fn create(
        &self,
        pool: Arc<PoolConfig>,
        _authorizer: Arc<dyn Authorizer>,
    ) -> (Arc<dyn PoolEngine>, mpsc::Receiver<EngineEvent>) {
        let (tx, rx) = mpsc::channel(1);
        let engine = Arc::new(IdleEngine {
            coin: pool.coin.name.clone(),
            _sender: tx,
        });
        (engine, rx)
    }
}
