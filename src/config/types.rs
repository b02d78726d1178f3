use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Process-wide portal settings, read once from `config.json` at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PortalConfig {
    pub cli: CliConfig,
    pub clustering: ClusteringConfig,
    /// Ledger connection used when neither a pool definition nor the pool
    /// defaults provide one.
    pub redis: RedisConfig,
    /// Template merged into any field a pool definition omits.
    pub default_pool_configs: PoolDefaults,
    pub pool_config_dir: PathBuf,
    pub coin_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CliConfig {
    pub port: u16,
    /// Control listener startup is held back this long so operator commands
    /// cannot race the initial fleet bring-up.
    pub start_delay_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClusteringConfig {
    pub enabled: bool,
    pub forks: Forks,
    pub spawn_stagger_ms: u64,
    pub respawn_delay_ms: u64,
}

/// Worker-count setting: an explicit count, or the string `"auto"` for one
/// worker per available processing unit. Anything else falls back to 1.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Forks {
    Count(u32),
    Setting(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RedisConfig {
    pub host: String,
    pub port: u16,
    pub db: i64,
    pub password: Option<String>,
}

/// Fields copied into pool definitions that omit them. Owned values are
/// cloned per pool, so no two pools ever share mutable default state.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct PoolDefaults {
    pub address: Option<String>,
    pub invalid_worker_label: Option<String>,
    pub redis: Option<RedisConfig>,
}

/// One on-disk pool definition, prior to profile resolution and merging.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolDefinition {
    #[serde(default)]
    pub enabled: bool,
    /// Coin profile file name under the coin directory.
    pub coin: String,
    #[serde(default)]
    pub ports: BTreeMap<u16, PortOptions>,
    #[serde(default)]
    pub daemons: Vec<DaemonEndpoint>,
    #[serde(default)]
    pub auxes: Vec<AuxDefinition>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub invalid_worker_label: Option<String>,
    #[serde(default)]
    pub redis: Option<RedisConfig>,
    #[serde(skip)]
    pub file_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct PortOptions {
    pub diff: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DaemonEndpoint {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuxDefinition {
    /// Aux coin profile file name under the coin directory.
    pub coin: String,
}

/// Coin identity and subsidy parameters from a `coins/` profile file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoinProfile {
    pub name: String,
    pub symbol: String,
    #[serde(default)]
    pub algorithm: Option<String>,
    /// Block reward at height 0, in base units.
    #[serde(default = "default_base_subsidy")]
    pub base_subsidy: u64,
    #[serde(default = "default_halving_interval")]
    pub halving_interval: u64,
}

fn default_base_subsidy() -> u64 {
    5_000_000_000
}

fn default_halving_interval() -> u64 {
    210_000
}

/// A fully resolved, accepted pool configuration. Built once by the
/// validator and never mutated; reloads replace the whole set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolConfig {
    pub file_name: String,
    pub coin: CoinProfile,
    pub ports: BTreeMap<u16, PortOptions>,
    pub daemons: Vec<DaemonEndpoint>,
    pub auxes: Vec<CoinProfile>,
    /// Fallback payout address credited when a worker identity fails
    /// address validation.
    pub address: String,
    pub invalid_worker_label: String,
    pub redis: RedisConfig,
}

impl PoolConfig {
    /// Resolve an aux coin by ticker symbol (case-insensitive).
    pub fn aux_by_symbol(&self, symbol: &str) -> Option<&CoinProfile> {
        self.auxes
            .iter()
            .find(|aux| aux.symbol.eq_ignore_ascii_case(symbol))
    }
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            cli: CliConfig::default(),
            clustering: ClusteringConfig::default(),
            redis: RedisConfig::default(),
            default_pool_configs: PoolDefaults::default(),
            pool_config_dir: PathBuf::from("pool_configs"),
            coin_dir: PathBuf::from("coins"),
        }
    }
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            port: 17117,
            start_delay_secs: 10,
        }
    }
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            forks: Forks::Count(1),
            spawn_stagger_ms: 250,
            respawn_delay_ms: 2000,
        }
    }
}

impl Default for Forks {
    fn default() -> Self {
        Forks::Count(1)
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 6379,
            db: 0,
            password: None,
        }
    }
}

impl ClusteringConfig {
    pub fn spawn_stagger(&self) -> Duration {
        Duration::from_millis(self.spawn_stagger_ms)
    }

    pub fn respawn_delay(&self) -> Duration {
        Duration::from_millis(self.respawn_delay_ms)
    }
}

impl PortalConfig {
    /// Load the portal configuration from a JSON file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::PortalConfigMissing {
                path: path.to_path_buf(),
            }
            .into());
        }
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Unreadable {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let config: PortalConfig = serde_json::from_str(&content)?;
        Ok(config)
    }
}
