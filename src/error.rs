use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by the portal core.
///
/// Configuration conflicts are the only fatal variants; everything else is
/// logged at the point of failure and service continues.
#[derive(Error, Debug)]
pub enum PortalError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("ledger error: {message}")]
    Ledger {
        message: String,
        /// Rendered batch contents, kept for the failure log.
        context: Option<String>,
    },

    #[error("engine error for {coin}: {message}")]
    Engine { coin: String, message: String },

    #[error("worker {fork_id} terminated: {message}")]
    WorkerTerminated { fork_id: usize, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("internal error: {message}")]
    Internal { message: String },
}

/// Startup-time configuration failures.
///
/// `PortCollision` and `DuplicateCoin` are safety invariants: starting with
/// either would silently misroute miner traffic or corrupt the ledger key
/// namespace, so the process must terminate instead of continuing.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("pool {second} has same configured port {port} as {first}")]
    PortCollision {
        port: u16,
        first: String,
        second: String,
    },

    #[error("pool {second} has same configured coin {coin} as {first}")]
    DuplicateCoin {
        coin: String,
        first: String,
        second: String,
    },

    #[error("portal config not found at {path}")]
    PortalConfigMissing { path: PathBuf },

    #[error("invalid pool definition {file}: {message}")]
    InvalidDefinition { file: String, message: String },

    #[error("failed to read {path}: {message}")]
    Unreadable { path: PathBuf, message: String },
}

pub type Result<T> = std::result::Result<T, PortalError>;
