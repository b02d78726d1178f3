#![allow(dead_code)]

use std::path::Path;
use std::time::Duration;

use serde_json::json;
use tempfile::TempDir;

use minefleet::config::{ClusteringConfig, Forks, PortalConfig};

/// Well-formed base58 payout addresses for fixtures.
pub const ADDR: &str = "1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa";
pub const ADDR2: &str = "1BoatSLRHtKNngkdXEeobR76b53LETtpyT";

/// Write a portal fixture: pool definitions under `pool_configs/`, coin
/// profiles under `coins/`, and a PortalConfig pointing at them with fast
/// timers for tests.
pub fn portal_fixture(
    pools: &[(&str, serde_json::Value)],
    coins: &[(&str, serde_json::Value)],
) -> (TempDir, PortalConfig) {
    let dir = TempDir::new().expect("create temp dir");
    let pool_dir = dir.path().join("pool_configs");
    let coin_dir = dir.path().join("coins");
    std::fs::create_dir(&pool_dir).unwrap();
    std::fs::create_dir(&coin_dir).unwrap();

    for (name, value) in pools {
        write_json(&pool_dir.join(name), value);
    }
    for (name, value) in coins {
        write_json(&coin_dir.join(name), value);
    }

    let mut portal = PortalConfig::default();
    portal.pool_config_dir = pool_dir;
    portal.coin_dir = coin_dir;
    portal.clustering = ClusteringConfig {
        enabled: false,
        forks: Forks::Count(1),
        spawn_stagger_ms: 10,
        respawn_delay_ms: 50,
    };
    (dir, portal)
}

pub fn write_json(path: &Path, value: &serde_json::Value) {
    std::fs::write(path, serde_json::to_string_pretty(value).unwrap()).unwrap();
}

/// A typical enabled bitcoin pool definition.
pub fn bitcoin_pool() -> serde_json::Value {
    json!({
        "enabled": true,
        "coin": "bitcoin.json",
        "address": ADDR,
        "invalidWorkerLabel": "misconfigured",
        "ports": { "3333": { "diff": 8 } },
        "daemons": [
            { "host": "127.0.0.1", "port": 8332, "user": "rpc", "password": "rpc" }
        ],
        "auxes": []
    })
}

pub fn bitcoin_coin() -> serde_json::Value {
    json!({
        "name": "Bitcoin",
        "symbol": "BTC",
        "algorithm": "sha256",
        "baseSubsidy": 5_000_000_000u64,
        "halvingInterval": 210_000
    })
}

pub fn namecoin_coin() -> serde_json::Value {
    json!({ "name": "Namecoin", "symbol": "NMC" })
}

/// Poll until `cond` holds or five seconds pass.
pub async fn wait_for<F: Fn() -> bool>(cond: F, what: &str) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !cond() {
        if tokio::time::Instant::now() > deadline {
            panic!("timed out waiting for {what}");
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}
