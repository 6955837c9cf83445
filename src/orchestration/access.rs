//! External collaborator seams: workspace authorization and GitHub
//! credential resolution. Both are consumed by the workflows through trait
//! objects; the db-backed implementations below are the production wiring.

use async_trait::async_trait;
use std::sync::Arc;

use crate::db::{DbHandle, WorkspaceAccess};
use crate::error::OrchestrationError;
use crate::vault::SecretVault;

/// Vault field context for stored GitHub tokens.
pub const GITHUB_TOKEN_FIELD: &str = "github_token";

#[derive(Clone)]
pub struct GithubIdentity {
    pub username: String,
    pub token: String,
}

impl std::fmt::Debug for GithubIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GithubIdentity")
            .field("username", &self.username)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

#[async_trait]
pub trait AuthorizationGuard: Send + Sync {
    /// Resolve whether `user_id` may act on `workspace_id`.
    async fn workspace_access(
        &self,
        user_id: &str,
        workspace_id: i64,
    ) -> Result<WorkspaceAccess, OrchestrationError>;
}

#[async_trait]
pub trait GithubCredentialResolver: Send + Sync {
    /// Resolve a user's GitHub username and personal access token.
    async fn username_and_token(
        &self,
        user_id: &str,
    ) -> Result<Option<GithubIdentity>, OrchestrationError>;
}

/// Membership-table-backed authorization.
pub struct DbAuthorizationGuard {
    db: DbHandle,
}

impl DbAuthorizationGuard {
    pub fn new(db: DbHandle) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AuthorizationGuard for DbAuthorizationGuard {
    async fn workspace_access(
        &self,
        user_id: &str,
        workspace_id: i64,
    ) -> Result<WorkspaceAccess, OrchestrationError> {
        self.db.get_workspace_access(workspace_id, user_id).await
    }
}

/// Credential-table-backed GitHub identity resolution; tokens are stored
/// as vault blobs and decrypted on use.
pub struct DbGithubCredentials {
    db: DbHandle,
    vault: Arc<SecretVault>,
}

impl DbGithubCredentials {
    pub fn new(db: DbHandle, vault: Arc<SecretVault>) -> Self {
        Self { db, vault }
    }
}

#[async_trait]
impl GithubCredentialResolver for DbGithubCredentials {
    async fn username_and_token(
        &self,
        user_id: &str,
    ) -> Result<Option<GithubIdentity>, OrchestrationError> {
        let Some(credential) = self.db.get_github_credential(user_id).await? else {
            return Ok(None);
        };

        let token = self.vault.decrypt(GITHUB_TOKEN_FIELD, &credential.token)?;
        Ok(Some(GithubIdentity {
            username: credential.username,
            token,
        }))
    }
}
