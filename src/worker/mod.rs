use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::accounting::{ShareAccountant, ShareEvent};
use crate::config::{PoolConfig, PoolSnapshot};
use crate::engine::{AllowAll, EngineEvent, EngineFactory, LogSeverity};
use crate::error::{PortalError, Result};
use crate::ledger::LedgerFactory;
use crate::supervisor::messages::{ControlMessage, WorkerMessage};

struct PoolInstance {
    engine: Arc<dyn crate::engine::PoolEngine>,
    route: JoinHandle<()>,
}

/// One worker unit: runs one protocol-engine instance and one accountant
/// per coin of the accepted set, routes engine events, and applies inbound
/// control messages until terminated.
pub struct Worker {
    fork_id: usize,
    snapshot: Arc<PoolSnapshot>,
    engines: Arc<dyn EngineFactory>,
    ledgers: Arc<dyn LedgerFactory>,
    to_supervisor: mpsc::Sender<WorkerMessage>,
    control: mpsc::Receiver<ControlMessage>,
}

impl Worker {
    pub fn new(
        fork_id: usize,
        snapshot: Arc<PoolSnapshot>,
        engines: Arc<dyn EngineFactory>,
        ledgers: Arc<dyn LedgerFactory>,
        to_supervisor: mpsc::Sender<WorkerMessage>,
        control: mpsc::Receiver<ControlMessage>,
    ) -> Self {
        Self {
            fork_id,
            snapshot,
            engines,
            ledgers,
            to_supervisor,
            control,
        }
    }

    pub async fn run(mut self) -> Result<()> {
        let mut pools: HashMap<String, PoolInstance> = HashMap::new();
        // Route tasks report the end of their event stream here; the sender
        // kept in scope means recv() never observes a closed channel.
        let (dead_tx, mut dead_rx) = mpsc::channel::<String>(16);

        for (coin, config) in self.snapshot.pools.clone() {
            match self.start_pool(config, dead_tx.clone()).await {
                Ok(instance) => {
                    pools.insert(coin, instance);
                }
                Err(e) => {
                    error!(fork_id = self.fork_id, coin = %coin, error = %e, "could not start pool");
                }
            }
        }
        info!(fork_id = self.fork_id, pools = pools.len(), "worker running");

        loop {
            tokio::select! {
                message = self.control.recv() => match message {
                    // Supervisor gone: clean shutdown.
                    None => return Ok(()),
                    Some(ControlMessage::BanIp { ip }) => {
                        for instance in pools.values() {
                            instance.engine.ban_ip(ip).await;
                        }
                        debug!(fork_id = self.fork_id, %ip, "ban applied to all local engines");
                    }
                    Some(ControlMessage::ReloadPool { coin, pools: snapshot }) => {
                        self.snapshot = snapshot;
                        self.restart_pool(&coin, &mut pools, dead_tx.clone()).await;
                    }
                    Some(ControlMessage::BlockNotify { coin, hash }) => {
                        // Only the owning worker acts; everyone else ignores.
                        if let Some(instance) = pools.get(&coin.to_lowercase()) {
                            instance.engine.block_notify(&hash).await;
                            debug!(fork_id = self.fork_id, coin = %coin, hash = %hash, "block notification forwarded");
                        }
                    }
                },
                Some(coin) = dead_rx.recv() => {
                    error!(fork_id = self.fork_id, coin = %coin, "engine event stream ended");
                    pools.remove(&coin);
                    if pools.is_empty() {
                        return Err(PortalError::WorkerTerminated {
                            fork_id: self.fork_id,
                            message: "all pool engines terminated".to_string(),
                        });
                    }
                }
            }
        }
    }

    /// Restart just the named coin's engine under the (already adopted) new
    /// snapshot, leaving other coins untouched.
    async fn restart_pool(
        &self,
        coin: &str,
        pools: &mut HashMap<String, PoolInstance>,
        dead_tx: mpsc::Sender<String>,
    ) {
        let coin = coin.to_lowercase();
        let Some(config) = self.snapshot.get(&coin).cloned() else {
            warn!(fork_id = self.fork_id, coin = %coin, "reload for a coin not in the accepted set");
            return;
        };

        if let Some(old) = pools.remove(&coin) {
            old.route.abort();
        }
        match self.start_pool(config, dead_tx).await {
            Ok(instance) => {
                info!(fork_id = self.fork_id, coin = %coin, version = self.snapshot.version, "pool restarted");
                pools.insert(coin, instance);
            }
            Err(e) => {
                error!(fork_id = self.fork_id, coin = %coin, error = %e, "could not restart pool");
            }
        }
    }

    /// Build one coin's engine, ledger connection and accountant, and spawn
    /// its event-routing task.
    async fn start_pool(
        &self,
        config: Arc<PoolConfig>,
        dead_tx: mpsc::Sender<String>,
    ) -> Result<PoolInstance> {
        let ledger = self.ledgers.open(&config).await?;
        let accountant = Arc::new(ShareAccountant::new(config.clone(), ledger, self.fork_id));
        let (engine, events) = self.engines.create(config.clone(), Arc::new(AllowAll));

        let route = tokio::spawn(route_events(
            config,
            accountant,
            events,
            self.to_supervisor.clone(),
            self.fork_id,
            dead_tx,
        ));

        Ok(PoolInstance { engine, route })
    }
}

/// Consume one engine's event stream until it ends.
async fn route_events(
    pool: Arc<PoolConfig>,
    accountant: Arc<ShareAccountant>,
    mut events: mpsc::Receiver<EngineEvent>,
    to_supervisor: mpsc::Sender<WorkerMessage>,
    fork_id: usize,
    dead_tx: mpsc::Sender<String>,
) {
    let coin = pool.coin.name.clone();

    while let Some(event) = events.recv().await {
        match event {
            EngineEvent::Share {
                valid_share,
                valid_block,
                data,
            } => {
                if valid_block {
                    info!(fork_id, coin = %coin, hash = ?data.block_hash, height = data.height, "block found");
                } else if data.block_hash.is_some() {
                    debug!(fork_id, coin = %coin, worker = %data.worker, "candidate block rejected by daemon");
                }
                if valid_share {
                    debug!(
                        fork_id,
                        coin = %coin,
                        worker = %data.worker,
                        difficulty = data.difficulty,
                        "share accepted"
                    );
                } else {
                    warn!(fork_id, coin = %coin, worker = %data.worker, "share rejected");
                }

                accountant
                    .record_share(ShareEvent {
                        valid_share,
                        valid_block,
                        worker: data.worker.clone(),
                        difficulty: data.difficulty,
                        block_difficulty: data.block_difficulty,
                        height: data.height,
                        block_hash: data.block_hash.clone(),
                        coin: coin.clone(),
                        aux: false,
                    })
                    .await;

                // Merged-mining targets are credited from the same
                // proof-of-work; aux block detection arrives via a separate
                // event, so block validity is forced false here.
                for aux in &pool.auxes {
                    accountant
                        .record_share(ShareEvent {
                            valid_share,
                            valid_block: false,
                            worker: data.worker.clone(),
                            difficulty: data.difficulty,
                            block_difficulty: data.block_difficulty,
                            height: data.height,
                            block_hash: data.block_hash.clone(),
                            coin: aux.name.clone(),
                            aux: true,
                        })
                        .await;
                }
            }
            EngineEvent::AuxBlock {
                symbol,
                height,
                hash,
                ..
            } => match pool.aux_by_symbol(&symbol) {
                Some(aux) => {
                    info!(fork_id, coin = %aux.name, height, hash = %hash, "aux block found");
                    accountant
                        .record_aux_block(&aux.name, true, Some(&hash))
                        .await;
                }
                None => {
                    warn!(fork_id, coin = %coin, symbol = %symbol, "aux block for unknown symbol");
                }
            },
            EngineEvent::DifficultyUpdate { worker, difficulty } => {
                // Hook for future backpressure/vardiff telemetry.
                debug!(fork_id, coin = %coin, worker = %worker, difficulty, "difficulty update");
            }
            EngineEvent::BanIp { ip, worker } => {
                debug!(fork_id, coin = %coin, %ip, worker = ?worker, "relaying ban to supervisor");
                if to_supervisor
                    .send(WorkerMessage::BanIp { ip, fork_id })
                    .await
                    .is_err()
                {
                    warn!(fork_id, coin = %coin, "supervisor channel closed, ban not propagated");
                }
            }
            EngineEvent::Log { severity, message } => match severity {
                LogSeverity::Debug => debug!(fork_id, coin = %coin, "{message}"),
                LogSeverity::Info => info!(fork_id, coin = %coin, "{message}"),
                LogSeverity::Warn => warn!(fork_id, coin = %coin, "{message}"),
                LogSeverity::Error => error!(fork_id, coin = %coin, "{message}"),
            },
        }
    }

    let _ = dead_tx.send(coin).await;
}
