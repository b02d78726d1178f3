use crate::config::PoolConfig;

/// Upper bound on a stored worker identity. Anything longer is an abuse of
/// the key namespace, not a real wallet address.
pub const MAX_WORKER_LEN: usize = 60;

/// A worker identity reduced to a payable address and an optional sub-worker
/// label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerIdentity {
    pub address: String,
    pub label: Option<String>,
}

impl WorkerIdentity {
    /// The full dot-joined identity as stored in hashrate samples.
    pub fn full(&self) -> String {
        match &self.label {
            Some(label) => format!("{}.{}", self.address, label),
            None => self.address.clone(),
        }
    }
}

/// Normalize a raw worker identity string: trim, cap the length, strip the
/// `:` key-field delimiter, and split on the first `.` into address and
/// label. Idempotent — normalizing an already-normalized identity yields the
/// same pair.
pub fn normalize_identity(raw: &str) -> WorkerIdentity {
    let trimmed: String = raw
        .trim()
        .chars()
        .filter(|c| *c != ':')
        .take(MAX_WORKER_LEN)
        .collect();

    match trimmed.split_once('.') {
        Some((address, label)) if !label.is_empty() => WorkerIdentity {
            address: address.to_string(),
            label: Some(label.to_string()),
        },
        Some((address, _)) => WorkerIdentity {
            address: address.to_string(),
            label: None,
        },
        None => WorkerIdentity {
            address: trimmed,
            label: None,
        },
    }
}

/// Address-format check: base58-decodable and within the usual encoded
/// length bounds. Deliberately permissive across coins — the point is to
/// keep garbage out of the ledger, not to verify checksums per chain.
pub fn is_valid_address(address: &str) -> bool {
    if !(26..=35).contains(&address.len()) {
        return false;
    }
    bs58::decode(address).into_vec().is_ok()
}

/// Resolve a raw worker identity to a payable one. An address that fails
/// validation is substituted with the pool's fallback address, under the
/// pool's fallback label (suffixed with the original label when present),
/// so every share is still credited somewhere rather than discarded.
pub fn resolve_worker(raw: &str, pool: &PoolConfig) -> WorkerIdentity {
    let identity = normalize_identity(raw);
    if is_valid_address(&identity.address) {
        return identity;
    }

    let label = match identity.label {
        Some(original) => format!("{}_{}", pool.invalid_worker_label, original),
        None => pool.invalid_worker_label.clone(),
    };
    WorkerIdentity {
        address: pool.address.clone(),
        label: Some(label),
    }
}
