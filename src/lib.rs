//! # Minefleet Mining Pool Portal
//!
//! A multi-coin mining pool portal written in Rust, covering:
//! - Supervision of a fleet of per-coin pool workers: staggered spawn,
//!   crash detection, fixed-delay respawn, control-message fan-out
//! - A transactional accounting engine that turns share/block events into
//!   a consistent payout ledger (atomic batches, no partial updates)
//! - A versioned configuration store with conflict detection across pool
//!   definitions and wholesale snapshot reloads
//!
//! ## Architecture
//!
//! The stratum protocol engine itself is an external collaborator: it is
//! consumed through the [`engine`] trait boundary (construct-from-config,
//! five event kinds, an authorization callback), which also makes the core
//! testable against a fake engine. Workers are supervised tokio tasks; all
//! cross-component communication is asynchronous message passing over
//! per-worker channels, which preserve send order per worker and guarantee
//! nothing across workers.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use minefleet::config::{ConfigStore, PortalConfig};
//! use minefleet::engine::IdleEngineFactory;
//! use minefleet::ledger::MemoryLedgerFactory;
//! use minefleet::supervisor::Supervisor;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let portal = PortalConfig::load_from_file("config.json")?;
//!     let store = Arc::new(ConfigStore::build(portal)?);
//!
//!     let supervisor = Supervisor::new(
//!         store,
//!         Arc::new(IdleEngineFactory),
//!         Arc::new(MemoryLedgerFactory::new()),
//!     );
//!     supervisor.start().await?;
//!
//!     tokio::signal::ctrl_c().await?;
//!     Ok(())
//! }
//! ```

/// Share accounting: identity normalization, subsidy schedule, ledger
/// batch construction
pub mod accounting;

/// Command-line interface for the portal
pub mod cli;

/// Configuration loading, conflict validation, and the versioned snapshot
/// store
pub mod config;

/// Operator command routing and the control-line listener
pub mod control;

/// Protocol-engine capability boundary and test/placeholder implementations
pub mod engine;

/// Typed errors for the portal core
pub mod error;

/// Atomic ledger batches over Redis or an in-memory store
pub mod ledger;

/// Worker fleet supervision and control-message fan-out
pub mod supervisor;

/// One worker unit: per-coin engines, accountants, and event routing
pub mod worker;

pub use config::{ConfigStore, PoolConfig, PortalConfig};
pub use error::{ConfigError, PortalError, Result};
pub use supervisor::Supervisor;
pub use worker::Worker;
