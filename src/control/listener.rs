use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

use crate::control::router::{CommandRouter, OperatorCommand};
use crate::error::Result;

/// Serve the operator control interface: one JSON command per line, one
/// reply line per command. Loopback only.
pub async fn serve(port: u16, router: Arc<CommandRouter>) -> Result<()> {
    let listener = TcpListener::bind(("127.0.0.1", port)).await?;
    info!(port, "control interface listening");

    loop {
        let (stream, addr) = listener.accept().await?;
        debug!(%addr, "operator connected");
        let router = router.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, router).await {
                warn!(%addr, error = %e, "control connection ended with error");
            }
        });
    }
}

async fn handle_connection(stream: TcpStream, router: Arc<CommandRouter>) -> Result<()> {
    let (read, mut write) = stream.into_split();
    let mut lines = BufReader::new(read).lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let reply = match serde_json::from_str::<OperatorCommand>(&line) {
            Ok(command) => router.handle(command).await,
            Err(e) => format!("malformed command: {e}"),
        };
        write.write_all(reply.as_bytes()).await?;
        write.write_all(b"\n").await?;
    }

    Ok(())
}
