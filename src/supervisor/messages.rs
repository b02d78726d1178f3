use std::net::IpAddr;
use std::sync::Arc;

use crate::config::PoolSnapshot;

/// Control messages fanned out supervisor → worker. Delivery over one
/// worker's channel preserves send order; nothing is ordered across workers.
#[derive(Debug, Clone)]
pub enum ControlMessage {
    /// Apply an IP ban to every engine the worker runs.
    BanIp { ip: IpAddr },
    /// Adopt a new accepted configuration set and restart the named coin's
    /// engine in place. Each worker decides whether the coin applies to it.
    ReloadPool {
        coin: String,
        pools: Arc<PoolSnapshot>,
    },
    /// Forward an externally observed block hash to the named coin's engine.
    BlockNotify { coin: String, hash: String },
}

/// Messages sent worker → supervisor.
#[derive(Debug, Clone)]
pub enum WorkerMessage {
    /// A ban discovered by one pool's engine, to be propagated fleet-wide.
    BanIp { ip: IpAddr, fork_id: usize },
}
