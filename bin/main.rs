use anyhow::Result;
use minefleet::cli;

#[tokio::main]
async fn main() -> Result<()> {
    cli::run().await
}
