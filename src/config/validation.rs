use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use tracing::{error, warn};

use crate::config::types::{CoinProfile, PoolConfig, PoolDefinition, PortalConfig};
use crate::error::{ConfigError, Result};

/// Build the accepted pool set from the on-disk definitions.
///
/// Cross-pool conflicts (shared stratum port, shared coin identity) are fatal
/// and returned as errors: starting with either would silently misroute miner
/// traffic or corrupt the ledger namespace. Everything else degrades to a
/// partial set — a pool missing its coin profile, an aux missing its profile,
/// or a pool with no daemons is dropped (or trimmed) with a log entry, since a
/// partial pool set is preferable to no pools at all.
pub fn build_pool_configs(portal: &PortalConfig) -> Result<BTreeMap<String, Arc<PoolConfig>>> {
    let definitions = read_definitions(&portal.pool_config_dir)?;

    check_conflicts(&definitions)?;

    let mut accepted: BTreeMap<String, Arc<PoolConfig>> = BTreeMap::new();

    for def in definitions {
        let Some(coin) = load_profile(&portal.coin_dir, &def.coin, &def.file_name) else {
            continue;
        };

        if let Some(existing) = accepted.get(&coin.name) {
            // Two definitions referencing distinct files can still resolve to
            // the same coin name; that is the same namespace collision.
            return Err(ConfigError::DuplicateCoin {
                coin: coin.name,
                first: existing.file_name.clone(),
                second: def.file_name,
            }
            .into());
        }

        let mut auxes = Vec::with_capacity(def.auxes.len());
        for aux in &def.auxes {
            // The pool still starts without a missing aux.
            if let Some(profile) = load_profile(&portal.coin_dir, &aux.coin, &def.file_name) {
                auxes.push(profile);
            }
        }

        if def.daemons.is_empty() {
            error!(
                pool = %def.file_name,
                coin = %coin.name,
                "no daemons configured so a pool cannot be started for this coin"
            );
            continue;
        }

        let defaults = &portal.default_pool_configs;
        let Some(address) = def.address.clone().or_else(|| defaults.address.clone()) else {
            error!(
                pool = %def.file_name,
                coin = %coin.name,
                "no payout address configured and no default available, dropping pool"
            );
            continue;
        };

        let invalid_worker_label = def
            .invalid_worker_label
            .clone()
            .or_else(|| defaults.invalid_worker_label.clone())
            .unwrap_or_else(|| "invalid".to_string());

        let redis = def
            .redis
            .clone()
            .or_else(|| defaults.redis.clone())
            .unwrap_or_else(|| portal.redis.clone());

        let name = coin.name.clone();
        accepted.insert(
            name,
            Arc::new(PoolConfig {
                file_name: def.file_name,
                coin,
                ports: def.ports,
                daemons: def.daemons,
                auxes,
                address,
                invalid_worker_label,
                redis,
            }),
        );
    }

    Ok(accepted)
}

/// Read and parse every enabled `.json` definition in the pool config
/// directory. Unreadable or malformed files are dropped with an error log.
fn read_definitions(dir: &Path) -> Result<Vec<PoolDefinition>> {
    let mut definitions = Vec::new();

    let entries = std::fs::read_dir(dir).map_err(|e| ConfigError::Unreadable {
        path: dir.to_path_buf(),
        message: e.to_string(),
    })?;

    for entry in entries {
        let entry = entry.map_err(|e| ConfigError::Unreadable {
            path: dir.to_path_buf(),
            message: e.to_string(),
        })?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        let file_name = entry.file_name().to_string_lossy().into_owned();

        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                error!(file = %file_name, error = %e, "could not read pool definition");
                continue;
            }
        };
        let mut def: PoolDefinition = match serde_json::from_str(&content) {
            Ok(def) => def,
            Err(e) => {
                error!(file = %file_name, error = %e, "could not parse pool definition");
                continue;
            }
        };
        if !def.enabled {
            continue;
        }
        def.file_name = file_name;
        definitions.push(def);
    }

    Ok(definitions)
}

/// Ensure no two enabled definitions share a stratum port or a coin file.
fn check_conflicts(definitions: &[PoolDefinition]) -> Result<()> {
    for (i, a) in definitions.iter().enumerate() {
        for b in definitions.iter().skip(i + 1) {
            for port in a.ports.keys() {
                if b.ports.contains_key(port) {
                    error!(
                        first = %a.file_name,
                        second = %b.file_name,
                        port = *port,
                        "pools share a configured stratum port"
                    );
                    return Err(ConfigError::PortCollision {
                        port: *port,
                        first: a.file_name.clone(),
                        second: b.file_name.clone(),
                    }
                    .into());
                }
            }
            if a.coin == b.coin {
                error!(
                    first = %a.file_name,
                    second = %b.file_name,
                    coin = %a.coin,
                    "pools share a configured coin file"
                );
                return Err(ConfigError::DuplicateCoin {
                    coin: a.coin.clone(),
                    first: a.file_name.clone(),
                    second: b.file_name.clone(),
                }
                .into());
            }
        }
    }
    Ok(())
}

/// Load a coin profile file, lowercasing its name so the ledger namespace is
/// case-stable. Returns `None` (with a warning) when the file is missing or
/// malformed.
fn load_profile(coin_dir: &Path, file: &str, pool_file: &str) -> Option<CoinProfile> {
    let path = coin_dir.join(file);
    if !path.exists() {
        warn!(pool = %pool_file, coin = %file, "could not find coin profile {}", path.display());
        return None;
    }
    let content = match std::fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) => {
            warn!(pool = %pool_file, coin = %file, error = %e, "could not read coin profile");
            return None;
        }
    };
    match serde_json::from_str::<CoinProfile>(&content) {
        Ok(mut profile) => {
            profile.name = profile.name.to_lowercase();
            Some(profile)
        }
        Err(e) => {
            warn!(pool = %pool_file, coin = %file, error = %e, "could not parse coin profile");
            None
        }
    }
}
