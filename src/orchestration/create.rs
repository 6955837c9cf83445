use podbay_schema::{CreatePoolRequest, EnvVar, PoolDescriptor};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::config::OrchestrationConfig;
use crate::db::{DbHandle, DbSwarm, PoolState, SwarmPatch};
use crate::error::OrchestrationError;
use crate::orchestration::access::{AuthorizationGuard, GithubCredentialResolver};
use crate::orchestration::credentials::{CredentialStore, POOL_API_KEY_FIELD};
use crate::pool_control::PoolControl;
use crate::vault::SecretVault;

/// Inbound request body for pool creation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PoolCreateRequest {
    #[serde(default)]
    pub container_files: BTreeMap<String, String>,

    #[serde(default)]
    pub environment_variables: Option<Vec<EnvVar>>,
}

/// Drives pool creation for a workspace's swarm.
pub struct PoolOrchestrator {
    db: DbHandle,
    vault: Arc<SecretVault>,
    control: Arc<dyn PoolControl>,
    credentials: CredentialStore,
    authz: Arc<dyn AuthorizationGuard>,
    github: Arc<dyn GithubCredentialResolver>,
    cfg: OrchestrationConfig,
}

impl PoolOrchestrator {
    pub fn new(
        db: DbHandle,
        vault: Arc<SecretVault>,
        control: Arc<dyn PoolControl>,
        credentials: CredentialStore,
        authz: Arc<dyn AuthorizationGuard>,
        github: Arc<dyn GithubCredentialResolver>,
        cfg: OrchestrationConfig,
    ) -> Self {
        Self {
            db,
            vault,
            control,
            credentials,
            authz,
            github,
            cfg,
        }
    }

    /// Create (or re-create) the pool backing a swarm.
    ///
    /// Once the preconditions pass, the attempt always leaves a terminal
    /// `pool_state` behind: `COMPLETE` on success, `FAILED` before any
    /// error is surfaced, so a caller retry never observes stale state.
    pub async fn create_pool(
        &self,
        caller: &str,
        workspace_id: i64,
        swarm_id: i64,
        request: PoolCreateRequest,
    ) -> Result<PoolDescriptor, OrchestrationError> {
        let swarm = self
            .db
            .get_swarm(workspace_id, swarm_id)
            .await?
            .ok_or_else(|| OrchestrationError::NotFound("Swarm not found".to_string()))?;

        let access = self.authz.workspace_access(caller, workspace_id).await?;
        if !access.allowed() {
            return Err(OrchestrationError::Forbidden);
        }

        // The pool name is never auto-provisioned; a swarm without one is
        // structurally misconfigured.
        if swarm.pool_name.trim().is_empty() {
            return Err(OrchestrationError::InvalidConfiguration(
                "Swarm has no pool name configured".to_string(),
            ));
        }

        match self.run_provisioning(caller, &swarm, request).await {
            Ok(descriptor) => {
                self.record_outcome(&swarm, PoolState::Complete).await?;
                info!(
                    workspace_id,
                    swarm_id,
                    pool = %swarm.pool_name,
                    "pool created"
                );
                Ok(descriptor)
            }
            Err(err) => {
                // FAILED must land before the error reaches the caller.
                if let Err(patch_err) = self.record_outcome(&swarm, PoolState::Failed).await {
                    error!(
                        swarm_id,
                        error = %patch_err,
                        "failed to record pool state after error"
                    );
                }
                Err(err)
            }
        }
    }

    async fn run_provisioning(
        &self,
        caller: &str,
        swarm: &DbSwarm,
        request: PoolCreateRequest,
    ) -> Result<PoolDescriptor, OrchestrationError> {
        let sealed_key = self.credentials.resolve(swarm).await?;
        let api_key = self.vault.decrypt(POOL_API_KEY_FIELD, &sealed_key)?;

        let repository = self.db.get_primary_repository(swarm.workspace_id).await?;
        let (repository_url, branch) = repository
            .map(|r| (r.repository_url, r.branch))
            .unwrap_or_default();

        let github = self
            .github
            .username_and_token(caller)
            .await?
            .ok_or_else(|| OrchestrationError::NotFound("GitHub PAT not found".to_string()))?;

        let (container_files, environment_variables) =
            self.merge_swarm_config(swarm, request).await?;

        let outbound = CreatePoolRequest {
            name: swarm.pool_name.clone(),
            min_vm_count: self.cfg.min_vm_count,
            repository_url,
            branch,
            github_username: github.username,
            github_token: github.token,
            environment_variables,
            container_files,
        };

        debug!(
            pool = %outbound.name,
            repository = %outbound.repository_url,
            files = outbound.container_files.len(),
            env_vars = outbound.environment_variables.len(),
            "requesting pool creation"
        );

        let descriptor = self.control.create_pool(&outbound, &api_key).await?;
        Ok(descriptor)
    }

    /// Container files (and environment variables) define the pod image
    /// contract: once stored on the swarm they win over whatever the
    /// request carries, so repeated re-creation is stable. An empty store
    /// adopts the request's values, persisted before the control-plane
    /// call.
    async fn merge_swarm_config(
        &self,
        swarm: &DbSwarm,
        request: PoolCreateRequest,
    ) -> Result<(BTreeMap<String, String>, Vec<EnvVar>), OrchestrationError> {
        let mut patch = SwarmPatch::default();

        let stored_files = swarm.container_files_map()?;
        let container_files = if stored_files.is_empty() && !request.container_files.is_empty() {
            patch.container_files = Some(serde_json::to_string(&request.container_files)?);
            request.container_files
        } else {
            stored_files
        };

        let stored_env = swarm.environment_variables_list()?;
        let environment_variables = if stored_env.is_empty() {
            match request.environment_variables.filter(|e| !e.is_empty()) {
                Some(requested) => {
                    patch.environment_variables = Some(serde_json::to_string(&requested)?);
                    requested
                }
                None => Vec::new(),
            }
        } else {
            stored_env
        };

        if patch.container_files.is_some() || patch.environment_variables.is_some() {
            self.db.patch_swarm(swarm.id, patch).await?;
        }

        Ok((container_files, environment_variables))
    }

    async fn record_outcome(
        &self,
        swarm: &DbSwarm,
        state: PoolState,
    ) -> Result<(), OrchestrationError> {
        let patch = SwarmPatch {
            pool_state: Some(state),
            ..SwarmPatch::default()
        };
        self.db.patch_swarm(swarm.id, patch).await
    }
}
