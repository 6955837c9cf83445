use podbay_schema::{PodDescriptor, PodRepository};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::config::OrchestrationConfig;
use crate::db::{DbHandle, DbWorkspace};
use crate::error::OrchestrationError;
use crate::orchestration::access::AuthorizationGuard;
use crate::orchestration::credentials::{CredentialStore, POOL_API_KEY_FIELD};
use crate::pool_control::{PoolControl, PoolControlError};
use crate::vault::SecretVault;

/// Confirmation payload for a completed drop.
#[derive(Debug, Clone, Serialize)]
pub struct DropOutcome {
    pub message: String,
}

pub const DROP_CONFIRMATION: &str = "Pod dropped";

/// Drives pod teardown for a workspace.
pub struct PodLifecycleManager {
    db: DbHandle,
    vault: Arc<SecretVault>,
    control: Arc<dyn PoolControl>,
    credentials: CredentialStore,
    authz: Arc<dyn AuthorizationGuard>,
    cfg: OrchestrationConfig,
}

impl PodLifecycleManager {
    pub fn new(
        db: DbHandle,
        vault: Arc<SecretVault>,
        control: Arc<dyn PoolControl>,
        credentials: CredentialStore,
        authz: Arc<dyn AuthorizationGuard>,
        cfg: OrchestrationConfig,
    ) -> Self {
        Self {
            db,
            vault,
            control,
            credentials,
            authz,
            cfg,
        }
    }

    /// Release the workspace's pod back to its pool, optionally resetting
    /// the pod's repository set to latest first.
    ///
    /// Teardown never mutates the swarm record; pool state tracking is
    /// specific to creation.
    pub async fn drop_pod(
        &self,
        caller: &str,
        workspace_id: i64,
        reset_to_latest: bool,
    ) -> Result<DropOutcome, OrchestrationError> {
        let workspace = self
            .db
            .get_workspace(workspace_id)
            .await?
            .ok_or_else(|| OrchestrationError::NotFound("Workspace not found".to_string()))?;

        let swarm = self
            .db
            .get_workspace_swarm(workspace.id)
            .await?
            .ok_or_else(|| OrchestrationError::NotFound("Swarm not found".to_string()))?;

        let access = self.authz.workspace_access(caller, workspace_id).await?;
        if !access.allowed() {
            return Err(OrchestrationError::Forbidden);
        }

        if swarm.pool_name.trim().is_empty() {
            return Err(OrchestrationError::InvalidConfiguration(
                "Swarm has no pool name configured".to_string(),
            ));
        }

        // Harness escape hatch: succeed without touching credentials or
        // the control plane.
        if self.cfg.mock_browser {
            info!(workspace_id, "mock browser mode active, skipping pod drop");
            return Ok(DropOutcome {
                message: DROP_CONFIRMATION.to_string(),
            });
        }

        let sealed_key = self.credentials.resolve(&swarm).await?;
        let api_key = self.vault.decrypt(POOL_API_KEY_FIELD, &sealed_key)?;

        let pod = match self
            .control
            .get_workspace_from_pool(&swarm.pool_name, &api_key)
            .await
        {
            Ok(pod) => pod,
            Err(err) if err.is_timeout() => {
                return Err(OrchestrationError::Unavailable(
                    "Pool manager timed out".to_string(),
                ));
            }
            Err(err) => {
                error!(pool = %swarm.pool_name, error = %err, "failed to resolve pod from pool");
                return Err(OrchestrationError::Internal("Failed to drop pod".to_string()));
            }
        };

        if reset_to_latest {
            self.reset_repositories(&workspace, &pod).await;
        }

        match self.control.drop_pod(&swarm.pool_name, &pod.id, &api_key).await {
            Ok(()) => {
                info!(pool = %swarm.pool_name, pod = %pod.id, "pod released back to pool");
                Ok(DropOutcome {
                    message: DROP_CONFIRMATION.to_string(),
                })
            }
            // A structured control-plane rejection is forwarded verbatim.
            Err(err @ PoolControlError::Api { .. }) => Err(err.into()),
            Err(err) if err.is_timeout() => Err(OrchestrationError::Unavailable(
                "Pool manager timed out".to_string(),
            )),
            Err(err) => {
                error!(pool = %swarm.pool_name, pod = %pod.id, error = %err, "pod drop failed");
                Err(OrchestrationError::Internal("Failed to drop pod".to_string()))
            }
        }
    }

    /// Best-effort repository reset via the pod's control port. Failure
    /// must never abort the drop.
    async fn reset_repositories(&self, workspace: &DbWorkspace, pod: &PodDescriptor) {
        let Some(control_url) = pod.port_mappings.get(&self.cfg.control_port) else {
            debug!(pod = %pod.id, "pod exposes no control port, skipping repository reset");
            return;
        };

        let repositories = match self.db.list_repositories(workspace.id).await {
            Ok(repositories) => repositories,
            Err(err) => {
                warn!(
                    workspace_id = workspace.id,
                    error = %err,
                    "failed to list repositories, skipping repository reset"
                );
                return;
            }
        };

        if repositories.is_empty() {
            debug!(workspace_id = workspace.id, "no repositories, skipping repository reset");
            return;
        }

        let repos: Vec<PodRepository> = repositories
            .into_iter()
            .map(|r| PodRepository {
                url: r.repository_url,
            })
            .collect();

        if let Err(err) = self
            .control
            .update_pod_repositories(control_url, &pod.password, &repos)
            .await
        {
            warn!(pod = %pod.id, error = %err, "repository reset failed, continuing with drop");
        }
    }
}
