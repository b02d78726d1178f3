mod common;

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

use common::{bitcoin_coin, bitcoin_pool, namecoin_coin, portal_fixture, wait_for, ADDR};
use minefleet::config::{ConfigStore, Forks};
use minefleet::control::{self, CommandRouter, OperatorCommand};
use minefleet::engine::{EngineEvent, FakeEngineFactory, ShareData};
use minefleet::ledger::{MemoryLedger, MemoryLedgerFactory};
use minefleet::supervisor::Supervisor;

struct Fleet {
    // Keeps the on-disk fixture alive for the duration of the test.
    _dir: TempDir,
    store: Arc<ConfigStore>,
    supervisor: Arc<Supervisor>,
    engines: FakeEngineFactory,
    ledger: MemoryLedger,
}

/// Bring up a fleet of `workers` workers over a single bitcoin pool (with a
/// namecoin merged-mining target) and wait until every slot is live.
async fn start_fleet(workers: u32) -> Fleet {
    let mut pool = bitcoin_pool();
    pool["auxes"] = json!([{ "coin": "namecoin.json" }]);

    let (dir, mut portal) = portal_fixture(
        &[("bitcoin.json", pool)],
        &[
            ("bitcoin.json", bitcoin_coin()),
            ("namecoin.json", namecoin_coin()),
        ],
    );
    portal.clustering.enabled = true;
    portal.clustering.forks = Forks::Count(workers);

    let store = Arc::new(ConfigStore::build(portal).unwrap());
    let engines = FakeEngineFactory::new();
    let ledgers = MemoryLedgerFactory::new();
    let ledger = ledgers.ledger();

    let supervisor = Supervisor::new(store.clone(), Arc::new(engines.clone()), Arc::new(ledgers));
    supervisor.start().await.unwrap();

    let want = workers as usize;
    {
        let supervisor = supervisor.clone();
        wait_for(|| supervisor.live_workers() == want, "fleet bring-up").await;
    }
    {
        let engines = engines.clone();
        wait_for(|| engines.engines().len() == want, "engine creation").await;
    }

    Fleet {
        _dir: dir,
        store,
        supervisor,
        engines,
        ledger,
    }
}

fn share_event(valid_share: bool, valid_block: bool, hash: Option<&str>) -> EngineEvent {
    EngineEvent::Share {
        valid_share,
        valid_block,
        data: ShareData {
            worker: format!("{ADDR}.rig1"),
            ip: Some(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 7))),
            difficulty: 100.0,
            block_difficulty: 1000.0,
            height: 0,
            block_hash: hash.map(str::to_string),
        },
    }
}

#[tokio::test]
async fn fleet_reaches_the_target_worker_count() {
    let fleet = start_fleet(3).await;
    assert_eq!(fleet.supervisor.live_workers(), 3);
    assert_eq!(fleet.engines.engines_for("bitcoin").len(), 3);
}

#[tokio::test]
async fn share_events_reach_the_ledger() {
    let fleet = start_fleet(1).await;
    let engine = fleet.engines.engines()[0].clone();

    assert!(engine.emit(share_event(true, false, None)).await);

    let ledger = fleet.ledger.clone();
    wait_for(
        || ledger.hash_field("bitcoin:shares:Today", ADDR) == Some(100.0),
        "share accounted",
    )
    .await;
    assert_eq!(
        fleet.ledger.hash_field("bitcoin:PPS_balances", ADDR),
        Some(500_000_000.0)
    );
    assert_eq!(fleet.ledger.series_len("bitcoin:hashrate"), 1);

    // The merged-mining namespace records no proof-of-work.
    assert_eq!(fleet.ledger.hash_field("namecoin:shares:Today", ADDR), None);
    assert_eq!(fleet.ledger.series_len("namecoin:hashrate"), 0);
}

#[tokio::test]
async fn aux_blocks_count_under_the_aux_namespace() {
    let fleet = start_fleet(1).await;
    let engine = fleet.engines.engines()[0].clone();

    // An unknown symbol is logged and dropped without breaking the stream.
    assert!(
        engine
            .emit(EngineEvent::AuxBlock {
                symbol: "DOGE".to_string(),
                height: 12,
                hash: "00ff".to_string(),
                tx: "aa".to_string(),
                difficulty: 1.0,
            })
            .await
    );
    assert!(
        engine
            .emit(EngineEvent::AuxBlock {
                symbol: "nmc".to_string(),
                height: 12,
                hash: "00cd".to_string(),
                tx: "bb".to_string(),
                difficulty: 1.0,
            })
            .await
    );

    let ledger = fleet.ledger.clone();
    wait_for(
        || ledger.hash_field("namecoin:stats", "validBlocks") == Some(1.0),
        "aux block accounted",
    )
    .await;
    assert_eq!(fleet.ledger.hash_field("doge:stats", "validBlocks"), None);
}

#[tokio::test]
async fn bans_fan_out_to_every_worker() {
    let fleet = start_fleet(2).await;
    let ip = IpAddr::V4(Ipv4Addr::new(203, 0, 113, 9));

    assert!(
        fleet.engines.engines()[0]
            .emit(EngineEvent::BanIp {
                ip,
                worker: Some(format!("{ADDR}.rig1")),
            })
            .await
    );

    // Every engine applies the ban, the originator's included.
    let engines = fleet.engines.clone();
    wait_for(
        || {
            engines
                .engines()
                .iter()
                .all(|e| e.banned_ips().contains(&ip))
        },
        "fleet-wide ban",
    )
    .await;
}

#[tokio::test]
async fn engine_death_respawns_the_slot_under_the_same_fork_id() {
    let fleet = start_fleet(1).await;
    assert_eq!(fleet.supervisor.worker_generation(0), Some(0));

    fleet.engines.engines()[0].kill();

    let supervisor = fleet.supervisor.clone();
    wait_for(
        || supervisor.worker_generation(0) == Some(1),
        "slot respawn",
    )
    .await;
    let engines = fleet.engines.clone();
    wait_for(|| engines.engines().len() == 2, "replacement engine").await;

    // The replacement is fully wired into accounting.
    assert!(fleet.engines.engines()[1].emit(share_event(true, false, None)).await);
    let ledger = fleet.ledger.clone();
    wait_for(
        || ledger.hash_field("bitcoin:shares:Today", ADDR) == Some(100.0),
        "share after respawn",
    )
    .await;
}

#[tokio::test]
async fn blocknotify_reaches_the_owning_engine() {
    let fleet = start_fleet(1).await;
    let router = CommandRouter::new(fleet.supervisor.clone(), fleet.store.clone());

    let reply = router
        .handle(OperatorCommand {
            command: "blocknotify".to_string(),
            params: vec!["Bitcoin".to_string(), "00ab".to_string()],
            options: serde_json::Value::Null,
        })
        .await;
    assert_eq!(reply, "Pool workers notified");

    let engines = fleet.engines.clone();
    wait_for(
        || {
            engines.engines()[0]
                .notified_hashes()
                .contains(&"00ab".to_string())
        },
        "block notification",
    )
    .await;
}

#[tokio::test]
async fn reloadpool_restarts_the_pool_under_a_new_snapshot() {
    let fleet = start_fleet(1).await;
    let router = CommandRouter::new(fleet.supervisor.clone(), fleet.store.clone());

    let reply = router
        .handle(OperatorCommand {
            command: "reloadpool".to_string(),
            params: vec!["bitcoin".to_string()],
            options: serde_json::Value::Null,
        })
        .await;
    assert_eq!(reply, "reloaded pool bitcoin");
    assert_eq!(fleet.store.current().version, 2);

    // The owning worker rebuilt the pool's engine from the new snapshot.
    let engines = fleet.engines.clone();
    wait_for(|| engines.engines().len() == 2, "pool restart").await;
    assert_eq!(fleet.supervisor.worker_generation(0), Some(0));
}

#[tokio::test]
async fn unrecognized_commands_get_a_reply_not_an_error() {
    let fleet = start_fleet(1).await;
    let router = CommandRouter::new(fleet.supervisor.clone(), fleet.store.clone());

    let reply = router
        .handle(OperatorCommand {
            command: "selfdestruct".to_string(),
            params: vec![],
            options: serde_json::Value::Null,
        })
        .await;
    assert_eq!(reply, "unrecognized command \"selfdestruct\"");
}

#[tokio::test]
async fn control_listener_answers_line_delimited_json() {
    let fleet = start_fleet(1).await;
    let router = Arc::new(CommandRouter::new(
        fleet.supervisor.clone(),
        fleet.store.clone(),
    ));

    let port = 47117;
    tokio::spawn(async move {
        let _ = control::serve(port, router).await;
    });

    // Give the listener a moment to bind.
    let stream = loop {
        match TcpStream::connect(("127.0.0.1", port)).await {
            Ok(stream) => break stream,
            Err(_) => tokio::time::sleep(Duration::from_millis(20)).await,
        }
    };
    let (read, mut write) = stream.into_split();
    let mut lines = BufReader::new(read).lines();

    write
        .write_all(b"{\"command\":\"blocknotify\",\"params\":[\"bitcoin\",\"00ab\"]}\n")
        .await
        .unwrap();
    assert_eq!(
        lines.next_line().await.unwrap().as_deref(),
        Some("Pool workers notified")
    );

    // Malformed input gets a reply on the same connection.
    write.write_all(b"not json\n").await.unwrap();
    let reply = lines.next_line().await.unwrap().unwrap();
    assert!(reply.starts_with("malformed command:"));
}
