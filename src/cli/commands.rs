use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::signal;
use tokio::time::Duration;
use tracing::{error, info};

use crate::cli::{Args, Commands};
use crate::config::{ConfigStore, PortalConfig};
use crate::control::{CommandRouter, OperatorCommand};
use crate::engine::{EngineFactory, IdleEngineFactory};
use crate::ledger::{LedgerFactory, MemoryLedgerFactory, RedisLedgerFactory};
use crate::supervisor::Supervisor;

pub async fn execute(args: Args) -> Result<()> {
    setup_logging(&args)?;

    match args.command {
        Commands::Start { memory_ledger } => start_portal(args.config, memory_ledger).await,
        Commands::Config { file, show } => validate_config(file.unwrap_or(args.config), show),
        Commands::Command { name, params, port } => {
            send_command(args.config, name, params, port).await
        }
    }
}

async fn start_portal(config_path: PathBuf, memory_ledger: bool) -> Result<()> {
    info!("starting mining pool portal");

    let portal = match PortalConfig::load_from_file(&config_path) {
        Ok(portal) => portal,
        Err(e) => {
            error!(error = %e, "could not load portal configuration, read the setup instructions");
            std::process::exit(1);
        }
    };

    // Port or coin-identity collisions are a startup safety invariant, not a
    // recoverable condition: continuing would silently misroute traffic.
    let store = match ConfigStore::build(portal) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            error!(error = %e, "pool configuration rejected");
            std::process::exit(1);
        }
    };

    let engines: Arc<dyn EngineFactory> = Arc::new(IdleEngineFactory);
    let ledgers: Arc<dyn LedgerFactory> = if memory_ledger {
        info!("using in-process memory ledger");
        Arc::new(MemoryLedgerFactory::new())
    } else {
        Arc::new(RedisLedgerFactory::new())
    };

    let supervisor = Supervisor::new(store.clone(), engines, ledgers);
    supervisor.start().await?;

    // The control interface comes up late so operator commands cannot race
    // the initial fleet bring-up.
    let router = Arc::new(CommandRouter::new(supervisor.clone(), store.clone()));
    let cli = store.portal().cli.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(cli.start_delay_secs)).await;
        if let Err(e) = crate::control::serve(cli.port, router).await {
            error!(error = %e, "control interface failed");
        }
    });

    signal::ctrl_c().await?;
    info!("shutting down");
    Ok(())
}

fn validate_config(file: PathBuf, show: bool) -> Result<()> {
    info!(file = %file.display(), "validating portal configuration");

    let portal = PortalConfig::load_from_file(&file)?;
    let store = ConfigStore::build(portal)?;
    let snapshot = store.current();

    info!(pools = snapshot.len(), "configuration is valid");

    if show {
        for (coin, pool) in &snapshot.pools {
            println!("{coin}: {:#?}", pool);
        }
    }

    Ok(())
}

async fn send_command(
    config_path: PathBuf,
    name: String,
    params: Vec<String>,
    port: Option<u16>,
) -> Result<()> {
    let port = match port {
        Some(port) => port,
        None => PortalConfig::load_from_file(&config_path)
            .map(|p| p.cli.port)
            .unwrap_or_else(|_| PortalConfig::default().cli.port),
    };

    let command = OperatorCommand {
        command: name,
        params,
        options: serde_json::Value::Null,
    };

    let stream = TcpStream::connect(("127.0.0.1", port)).await?;
    let (read, mut write) = stream.into_split();

    write
        .write_all(serde_json::to_string(&command)?.as_bytes())
        .await?;
    write.write_all(b"\n").await?;

    let mut lines = BufReader::new(read).lines();
    if let Some(reply) = lines.next_line().await? {
        println!("{reply}");
    }

    Ok(())
}

fn setup_logging(args: &Args) -> Result<()> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter, Layer};

    let log_level = match args.verbose {
        0 => args.log_level.as_str(),
        1 => "debug",
        _ => "trace",
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let fmt_layer = if args.log_json {
        fmt::layer().json().boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .compact()
            .boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    Ok(())
}
