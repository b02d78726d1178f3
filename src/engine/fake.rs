//! Scriptable in-process engine for integration tests: events are injected
//! by the test, and control calls are recorded for assertions.

use std::net::IpAddr;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::config::PoolConfig;
use crate::engine::{Authorizer, EngineEvent, EngineFactory, PoolEngine};

#[derive(Debug, Default)]
struct Recorded {
    banned: Vec<IpAddr>,
    notified: Vec<String>,
}

#[derive(Debug)]
pub struct FakeEngine {
    coin: String,
    recorded: Mutex<Recorded>,
    // Held so tests can inject events or drop it to simulate engine death.
    sender: Mutex<Option<mpsc::Sender<EngineEvent>>>,
}

impl FakeEngine {
    pub fn banned_ips(&self) -> Vec<IpAddr> {
        self.recorded.lock().unwrap().banned.clone()
    }

    pub fn notified_hashes(&self) -> Vec<String> {
        self.recorded.lock().unwrap().notified.clone()
    }

    /// Inject an event as if the engine had emitted it. Returns false when
    /// the consumer side is gone.
    pub async fn emit(&self, event: EngineEvent) -> bool {
        let sender = self.sender.lock().unwrap().clone();
        match sender {
            Some(tx) => tx.send(event).await.is_ok(),
            None => false,
        }
    }

    /// Drop the event sender, ending the event stream — the worker observes
    /// this as an engine crash.
    pub fn kill(&self) {
        self.sender.lock().unwrap().take();
    }
}

#[async_trait]
impl PoolEngine for FakeEngine {
    fn coin(&self) -> &str {
        &self.coin
    }

    async fn ban_ip(&self, ip: IpAddr) {
        self.recorded.lock().unwrap().banned.push(ip);
    }

    async fn block_notify(&self, hash: &str) {
        self.recorded.lock().unwrap().notified.push(hash.to_string());
    }
}

/// Factory keeping a registry of every engine it created, in creation order,
/// so tests can reach into any worker's instances.
#[derive(Debug, Default, Clone)]
pub struct FakeEngineFactory {
    created: Arc<Mutex<Vec<Arc<FakeEngine>>>>,
}

impl FakeEngineFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn engines(&self) -> Vec<Arc<FakeEngine>> {
        self.created.lock().unwrap().clone()
    }

    pub fn engines_for(&self, coin: &str) -> Vec<Arc<FakeEngine>> {
        self.engines()
            .into_iter()
            .filter(|e| e.coin == coin)
            .collect()
    }
}

impl EngineFactory for FakeEngineFactory {
    fn create(
        &self,
        pool: Arc<PoolConfig>,
        _authorizer: Arc<dyn Authorizer>,
    ) -> (Arc<dyn PoolEngine>, mpsc::Receiver<EngineEvent>) {
        let (tx, rx) = mpsc::channel(64);
        let engine = Arc::new(FakeEngine {
            coin: pool.coin.name.clone(),
            recorded: Mutex::default(),
            sender: Mutex::new(Some(tx)),
        });
        self.created.lock().unwrap().push(engine.clone());
        (engine, rx)
    }
}
