use std::sync::Arc;
use tracing::{debug, warn};

use crate::db::{DbHandle, DbSwarm, SwarmPatch};
use crate::error::OrchestrationError;
use crate::pool_control::PoolControl;
use crate::vault::SecretVault;

/// Vault field context for stored pool API keys.
pub const POOL_API_KEY_FIELD: &str = "pool_api_key";

/// Resolves a swarm's pool API key, self-healing a missing one exactly
/// once per call.
#[derive(Clone)]
pub struct CredentialStore {
    db: DbHandle,
    vault: Arc<SecretVault>,
    control: Arc<dyn PoolControl>,
}

impl CredentialStore {
    pub fn new(db: DbHandle, vault: Arc<SecretVault>, control: Arc<dyn PoolControl>) -> Self {
        Self { db, vault, control }
    }

    /// Returns the swarm's encrypted pool API key blob.
    ///
    /// Deliberately a check -> provision -> re-check sequence rather than a
    /// retry loop: a key that is still absent after one provisioning
    /// attempt is a terminal configuration error, not a transient one.
    pub async fn resolve(&self, swarm: &DbSwarm) -> Result<String, OrchestrationError> {
        if let Some(key) = non_empty(swarm.pool_api_key.clone()) {
            return Ok(key);
        }

        debug!(swarm_id = swarm.id, pool = %swarm.pool_name, "pool api key absent, provisioning");
        self.provision(swarm).await;

        let refreshed = self.db.get_swarm(swarm.workspace_id, swarm.id).await?;
        refreshed
            .and_then(|s| non_empty(s.pool_api_key))
            .ok_or_else(|| {
                OrchestrationError::InvalidConfiguration(
                    "Swarm not properly configured with pool information".to_string(),
                )
            })
    }

    /// Mint, encrypt and persist a fresh key. Failures are logged and
    /// swallowed; `resolve` turns a still-absent key into the terminal
    /// error.
    async fn provision(&self, swarm: &DbSwarm) {
        let minted = match self.control.provision_api_key(&swarm.pool_name).await {
            Ok(minted) => minted,
            Err(err) => {
                warn!(pool = %swarm.pool_name, error = %err, "pool api key provisioning failed");
                return;
            }
        };

        let sealed = match self.vault.encrypt(POOL_API_KEY_FIELD, &minted) {
            Ok(sealed) => sealed,
            Err(err) => {
                warn!(swarm_id = swarm.id, error = %err, "failed to encrypt provisioned pool api key");
                return;
            }
        };

        let patch = SwarmPatch {
            pool_api_key: Some(sealed),
            ..SwarmPatch::default()
        };
        if let Err(err) = self.db.patch_swarm(swarm.id, patch).await {
            warn!(swarm_id = swarm.id, error = %err, "failed to persist provisioned pool api key");
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
