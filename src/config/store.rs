use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use tracing::info;

use crate::config::types::{PoolConfig, PortalConfig};
use crate::config::validation::build_pool_configs;
use crate::error::Result;

/// An immutable, versioned view of the accepted pool set.
///
/// Consumers hold the `Arc` they read; a reload never mutates a published
/// snapshot, it swaps in a new one.
#[derive(Debug)]
pub struct PoolSnapshot {
    pub version: u64,
    pub pools: BTreeMap<String, Arc<PoolConfig>>,
}

impl PoolSnapshot {
    pub fn get(&self, coin: &str) -> Option<&Arc<PoolConfig>> {
        let coin = coin.to_lowercase();
        self.pools.get(&coin)
    }

    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pools.len()
    }
}

/// Versioned configuration store. Built once at startup (fatal on conflict),
/// re-runnable wholesale through [`ConfigStore::reload`].
#[derive(Debug)]
pub struct ConfigStore {
    portal: Arc<PortalConfig>,
    current: RwLock<Arc<PoolSnapshot>>,
    version: AtomicU64,
}

impl ConfigStore {
    /// Run the validator and publish the initial snapshot.
    pub fn build(portal: PortalConfig) -> Result<Self> {
        let pools = build_pool_configs(&portal)?;
        let snapshot = Arc::new(PoolSnapshot { version: 1, pools });
        info!(pools = snapshot.len(), "accepted pool configuration set");

        Ok(Self {
            portal: Arc::new(portal),
            current: RwLock::new(snapshot),
            version: AtomicU64::new(1),
        })
    }

    pub fn portal(&self) -> &Arc<PortalConfig> {
        &self.portal
    }

    pub fn current(&self) -> Arc<PoolSnapshot> {
        self.current.read().expect("config store lock poisoned").clone()
    }

    /// Re-run the full validator and atomically replace the current snapshot.
    /// On failure the previous snapshot stays published.
    pub fn reload(&self) -> Result<Arc<PoolSnapshot>> {
        let pools = build_pool_configs(&self.portal)?;
        let version = self.version.fetch_add(1, Ordering::SeqCst) + 1;
        let snapshot = Arc::new(PoolSnapshot { version, pools });

        *self.current.write().expect("config store lock poisoned") = snapshot.clone();
        info!(version, pools = snapshot.len(), "pool configuration reloaded");

        Ok(snapshot)
    }
}
