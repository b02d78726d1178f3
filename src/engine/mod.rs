pub mod fake;
pub mod idle;

pub use fake::{FakeEngine, FakeEngineFactory};
pub use idle::IdleEngineFactory;

use std::net::IpAddr;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::debug;

use crate::config::PoolConfig;

/// Share data as carried by an engine `share` event, before accounting.
#[derive(Debug, Clone)]
pub struct ShareData {
    pub worker: String,
    pub ip: Option<IpAddr>,
    pub difficulty: f64,
    pub block_difficulty: f64,
    pub height: u64,
    pub block_hash: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogSeverity {
    Debug,
    Info,
    Warn,
    Error,
}

/// The five event kinds a protocol engine emits, per coin instance.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    Share {
        valid_share: bool,
        valid_block: bool,
        data: ShareData,
    },
    AuxBlock {
        symbol: String,
        height: u64,
        hash: String,
        tx: String,
        difficulty: f64,
    },
    DifficultyUpdate {
        worker: String,
        difficulty: f64,
    },
    BanIp {
        ip: IpAddr,
        worker: Option<String>,
    },
    Log {
        severity: LogSeverity,
        message: String,
    },
}

#[derive(Debug, Clone)]
pub struct AuthRequest {
    pub ip: IpAddr,
    pub port: u16,
    pub worker_name: String,
    pub password: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AuthDecision {
    pub authorized: bool,
    pub disconnect: bool,
    pub error: Option<String>,
}

/// Authorization callback handed to the engine at construction time.
#[async_trait]
pub trait Authorizer: Send + Sync {
    async fn authorize(&self, request: AuthRequest) -> AuthDecision;
}

/// Pass-through authorizer: every worker is authorized. An extension point,
/// not a hard requirement.
#[derive(Debug, Default, Clone)]
pub struct AllowAll;

#[async_trait]
impl Authorizer for AllowAll {
    async fn authorize(&self, request: AuthRequest) -> AuthDecision {
        debug!(
            worker = %request.worker_name,
            ip = %request.ip,
            port = request.port,
            "authorized"
        );
        AuthDecision {
            authorized: true,
            disconnect: false,
            error: None,
        }
    }
}

/// Control surface of one running protocol-engine instance.
///
/// The engine itself (stratum wire protocol, proof-of-work validation, job
/// assignment) is an external collaborator; the portal only consumes its
/// event stream and pushes bans and block notifications back in.
#[async_trait]
pub trait PoolEngine: Send + Sync {
    fn coin(&self) -> &str;

    /// Add an IP to the engine's ban list.
    async fn ban_ip(&self, ip: IpAddr);

    /// Forward an externally observed block hash so the engine re-polls for
    /// work immediately instead of waiting for its poll interval.
    async fn block_notify(&self, hash: &str);
}

/// Constructs one engine instance per coin from its accepted configuration.
pub trait EngineFactory: Send + Sync {
    fn create(
        &self,
        pool: Arc<PoolConfig>,
        authorizer: Arc<dyn Authorizer>,
    ) -> (Arc<dyn PoolEngine>, mpsc::Receiver<EngineEvent>);
}
