pub mod messages;

pub use messages::{ControlMessage, WorkerMessage};

use std::sync::Arc;
use std::sync::Mutex;

use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::config::{ClusteringConfig, ConfigStore, Forks};
use crate::engine::EngineFactory;
use crate::error::Result;
use crate::ledger::LedgerFactory;
use crate::worker::Worker;

/// Supervisor-side record of one live worker slot.
#[derive(Debug, Clone)]
pub struct WorkerHandle {
    pub fork_id: usize,
    /// Bumped each time the slot is respawned.
    pub generation: u64,
    sender: mpsc::Sender<ControlMessage>,
}

/// Number of worker units the clustering policy asks for.
pub fn target_workers(clustering: &ClusteringConfig) -> usize {
    if !clustering.enabled {
        return 1;
    }
    match &clustering.forks {
        Forks::Count(n) if *n > 0 => *n as usize,
        Forks::Setting(s) if s == "auto" => std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1),
        _ => 1,
    }
}

/// Owns the fleet of worker units: staggered spawn, exit detection with
/// fixed-delay respawn under a stable fork identifier, and typed
/// control-message fan-out.
pub struct Supervisor {
    store: Arc<ConfigStore>,
    engines: Arc<dyn EngineFactory>,
    ledgers: Arc<dyn LedgerFactory>,
    workers: DashMap<usize, WorkerHandle>,
    worker_tx: mpsc::Sender<WorkerMessage>,
    // Taken once by start(); kept here so new() stays infallible.
    worker_rx: Mutex<Option<mpsc::Receiver<WorkerMessage>>>,
}

impl Supervisor {
    pub fn new(
        store: Arc<ConfigStore>,
        engines: Arc<dyn EngineFactory>,
        ledgers: Arc<dyn LedgerFactory>,
    ) -> Arc<Self> {
        let (worker_tx, worker_rx) = mpsc::channel(256);
        Arc::new(Self {
            store,
            engines,
            ledgers,
            workers: DashMap::new(),
            worker_tx,
            worker_rx: Mutex::new(Some(worker_rx)),
        })
    }

    /// Bring up the fleet. Returns once bring-up is scheduled; the slots
    /// themselves spawn on the configured stagger interval so startup does
    /// not thunder against the ledger store and upstream daemons.
    pub async fn start(self: &Arc<Self>) -> Result<()> {
        let snapshot = self.store.current();
        if snapshot.is_empty() {
            warn!("no pool configs exist or are enabled, no pools spawned");
            return Ok(());
        }

        if let Some(rx) = self.worker_rx.lock().expect("supervisor lock poisoned").take() {
            let this = self.clone();
            tokio::spawn(async move { this.fan_out(rx).await });
        }

        let clustering = self.store.portal().clustering.clone();
        let count = target_workers(&clustering);
        let stagger = clustering.spawn_stagger();
        let pools = snapshot.len();

        let this = self.clone();
        tokio::spawn(async move {
            for fork_id in 0..count {
                this.spawn_slot(fork_id);
                tokio::time::sleep(stagger).await;
            }
            debug!(pools, workers = count, "spawned pool(s) on worker(s)");
        });

        Ok(())
    }

    /// One supervised slot: run a worker, and on any exit log it, wait the
    /// fixed respawn delay and spawn a replacement with the same fork
    /// identifier. Steady cadence, no backoff.
    fn spawn_slot(self: &Arc<Self>, fork_id: usize) {
        let this = self.clone();
        tokio::spawn(async move {
            let mut generation = 0u64;
            loop {
                let (tx, rx) = mpsc::channel(64);
                this.workers.insert(
                    fork_id,
                    WorkerHandle {
                        fork_id,
                        generation,
                        sender: tx,
                    },
                );

                let worker = Worker::new(
                    fork_id,
                    this.store.current(),
                    this.engines.clone(),
                    this.ledgers.clone(),
                    this.worker_tx.clone(),
                    rx,
                );
                let outcome = tokio::spawn(worker.run()).await;
                this.workers.remove(&fork_id);

                match outcome {
                    Ok(Ok(())) => info!(fork_id, "worker exited, spawning replacement"),
                    Ok(Err(e)) => error!(fork_id, error = %e, "worker died, spawning replacement"),
                    Err(e) => error!(fork_id, error = %e, "worker task aborted, spawning replacement"),
                }

                tokio::time::sleep(this.store.portal().clustering.respawn_delay()).await;
                generation += 1;
            }
        });
    }

    /// Rebroadcast worker-originated messages fleet-wide. The originator is
    /// included: it applies the ban on receipt like everyone else.
    async fn fan_out(self: Arc<Self>, mut rx: mpsc::Receiver<WorkerMessage>) {
        while let Some(message) = rx.recv().await {
            match message {
                WorkerMessage::BanIp { ip, fork_id } => {
                    info!(%ip, origin = fork_id, "propagating ban fleet-wide");
                    self.broadcast(ControlMessage::BanIp { ip }).await;
                }
            }
        }
    }

    /// Send a control message to every live worker. Failures against a
    /// dying worker are logged and ignored; its replacement picks up state
    /// from the current snapshot.
    pub async fn broadcast(&self, message: ControlMessage) {
        let handles: Vec<(usize, mpsc::Sender<ControlMessage>)> = self
            .workers
            .iter()
            .map(|entry| (entry.fork_id, entry.sender.clone()))
            .collect();

        for (fork_id, sender) in handles {
            if sender.send(message.clone()).await.is_err() {
                warn!(fork_id, "control message dropped, worker channel closed");
            }
        }
    }

    pub fn live_workers(&self) -> usize {
        self.workers.len()
    }

    pub fn worker_generation(&self, fork_id: usize) -> Option<u64> {
        self.workers.get(&fork_id).map(|h| h.generation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clustering_disabled_means_one_worker() {
        let clustering = ClusteringConfig {
            enabled: false,
            forks: Forks::Count(8),
            ..ClusteringConfig::default()
        };
        assert_eq!(target_workers(&clustering), 1);
    }

    #[test]
    fn explicit_count_is_honored() {
        let clustering = ClusteringConfig {
            enabled: true,
            forks: Forks::Count(3),
            ..ClusteringConfig::default()
        };
        assert_eq!(target_workers(&clustering), 3);
    }

    #[test]
    fn zero_or_junk_falls_back_to_one() {
        let clustering = ClusteringConfig {
            enabled: true,
            forks: Forks::Count(0),
            ..ClusteringConfig::default()
        };
        assert_eq!(target_workers(&clustering), 1);

        let clustering = ClusteringConfig {
            enabled: true,
            forks: Forks::Setting("many".to_string()),
            ..ClusteringConfig::default()
        };
        assert_eq!(target_workers(&clustering), 1);
    }

    #[test]
    fn auto_uses_available_parallelism() {
        let clustering = ClusteringConfig {
            enabled: true,
            forks: Forks::Setting("auto".to_string()),
            ..ClusteringConfig::default()
        };
        assert!(target_workers(&clustering) >= 1);
    }
}
