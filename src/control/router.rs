use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::config::ConfigStore;
use crate::supervisor::{ControlMessage, Supervisor};

/// A decoded operator command as delivered by the control listener.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperatorCommand {
    pub command: String,
    #[serde(default)]
    pub params: Vec<String>,
    #[serde(default)]
    pub options: serde_json::Value,
}

/// Translates operator commands into control messages and produces exactly
/// one reply per command. Never fails: unknown commands get a reply, not an
/// error.
pub struct CommandRouter {
    supervisor: Arc<Supervisor>,
    store: Arc<ConfigStore>,
}

impl CommandRouter {
    pub fn new(supervisor: Arc<Supervisor>, store: Arc<ConfigStore>) -> Self {
        Self { supervisor, store }
    }

    pub async fn handle(&self, command: OperatorCommand) -> String {
        match command.command.as_str() {
            "blocknotify" => {
                let coin = command.params.first().cloned().unwrap_or_default();
                let hash = command.params.get(1).cloned().unwrap_or_default();
                info!(coin = %coin, hash = %hash, "operator block notification");
                // Acknowledged regardless of whether any worker owns the
                // coin; the per-coin worker decides applicability.
                self.supervisor
                    .broadcast(ControlMessage::BlockNotify { coin, hash })
                    .await;
                "Pool workers notified".to_string()
            }
            "reloadpool" => {
                let coin = command.params.first().cloned().unwrap_or_default();
                match self.store.reload() {
                    Ok(snapshot) => {
                        self.supervisor
                            .broadcast(ControlMessage::ReloadPool {
                                coin: coin.clone(),
                                pools: snapshot,
                            })
                            .await;
                        format!("reloaded pool {coin}")
                    }
                    Err(e) => {
                        // The previous snapshot stays in effect.
                        error!(error = %e, "pool reload failed");
                        format!("failed to reload pools: {e}")
                    }
                }
            }
            other => format!("unrecognized command \"{other}\""),
        }
    }
}
