use crate::db::models::{
    DbGithubCredential, DbRepository, DbSwarm, DbWorkspace, WorkspaceAccess,
};
use crate::db::patch::{
    GithubCredentialCreate, RepositoryCreate, SwarmCreate, SwarmPatch, WorkspaceCreate,
};
use crate::db::schema::SQLITE_INIT;
use crate::error::OrchestrationError;
use chrono::Utc;
use ractor::{Actor, ActorProcessingErr, ActorRef, RpcReplyPort};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use std::{str::FromStr, time::Duration};
use tracing::info;

#[derive(Debug)]
pub enum DbMessage {
    /// Create a workspace and return its id.
    CreateWorkspace(WorkspaceCreate, RpcReplyPort<Result<i64, OrchestrationError>>),

    /// Create a swarm for a workspace and return its id.
    CreateSwarm(SwarmCreate, RpcReplyPort<Result<i64, OrchestrationError>>),

    /// Create a repository for a workspace and return its id.
    CreateRepository(RepositoryCreate, RpcReplyPort<Result<i64, OrchestrationError>>),

    /// Add a non-owner member to a workspace.
    AddWorkspaceMember(i64, String, RpcReplyPort<Result<(), OrchestrationError>>),

    /// Create or replace a user's GitHub credential and return its id.
    UpsertGithubCredential(
        GithubCredentialCreate,
        RpcReplyPort<Result<i64, OrchestrationError>>,
    ),

    /// Get a workspace by id.
    GetWorkspace(i64, RpcReplyPort<Result<Option<DbWorkspace>, OrchestrationError>>),

    /// Get a swarm by id, scoped to its workspace.
    GetSwarm(
        i64,
        i64,
        RpcReplyPort<Result<Option<DbSwarm>, OrchestrationError>>,
    ),

    /// Get the swarm belonging to a workspace.
    GetWorkspaceSwarm(i64, RpcReplyPort<Result<Option<DbSwarm>, OrchestrationError>>),

    /// Get the workspace's primary repository (first by creation order).
    GetPrimaryRepository(
        i64,
        RpcReplyPort<Result<Option<DbRepository>, OrchestrationError>>,
    ),

    /// List all repositories of a workspace in creation order.
    ListRepositories(i64, RpcReplyPort<Result<Vec<DbRepository>, OrchestrationError>>),

    /// Resolve a user's relationship to a workspace.
    GetWorkspaceAccess(
        i64,
        String,
        RpcReplyPort<Result<WorkspaceAccess, OrchestrationError>>,
    ),

    /// Get a user's GitHub credential.
    GetGithubCredential(
        String,
        RpcReplyPort<Result<Option<DbGithubCredential>, OrchestrationError>>,
    ),

    /// Patch a swarm's orchestration columns.
    PatchSwarm(i64, SwarmPatch, RpcReplyPort<Result<(), OrchestrationError>>),
}

#[derive(Clone)]
pub struct DbHandle {
    actor: ActorRef<DbMessage>,
}

impl DbHandle {
    pub async fn create_workspace(&self, create: WorkspaceCreate) -> Result<i64, OrchestrationError> {
        ractor::call!(self.actor, DbMessage::CreateWorkspace, create)
            .map_err(|e| OrchestrationError::Rpc(format!("DbActor CreateWorkspace rpc failed: {e}")))?
    }

    pub async fn create_swarm(&self, create: SwarmCreate) -> Result<i64, OrchestrationError> {
        ractor::call!(self.actor, DbMessage::CreateSwarm, create)
            .map_err(|e| OrchestrationError::Rpc(format!("DbActor CreateSwarm rpc failed: {e}")))?
    }

    pub async fn create_repository(
        &self,
        create: RepositoryCreate,
    ) -> Result<i64, OrchestrationError> {
        ractor::call!(self.actor, DbMessage::CreateRepository, create)
            .map_err(|e| OrchestrationError::Rpc(format!("DbActor CreateRepository rpc failed: {e}")))?
    }

    pub async fn add_workspace_member(
        &self,
        workspace_id: i64,
        user_id: impl Into<String>,
    ) -> Result<(), OrchestrationError> {
        ractor::call!(
            self.actor,
            DbMessage::AddWorkspaceMember,
            workspace_id,
            user_id.into()
        )
        .map_err(|e| OrchestrationError::Rpc(format!("DbActor AddWorkspaceMember rpc failed: {e}")))?
    }

    pub async fn upsert_github_credential(
        &self,
        create: GithubCredentialCreate,
    ) -> Result<i64, OrchestrationError> {
        ractor::call!(self.actor, DbMessage::UpsertGithubCredential, create).map_err(|e| {
            OrchestrationError::Rpc(format!("DbActor UpsertGithubCredential rpc failed: {e}"))
        })?
    }

    pub async fn get_workspace(
        &self,
        workspace_id: i64,
    ) -> Result<Option<DbWorkspace>, OrchestrationError> {
        ractor::call!(self.actor, DbMessage::GetWorkspace, workspace_id)
            .map_err(|e| OrchestrationError::Rpc(format!("DbActor GetWorkspace rpc failed: {e}")))?
    }

    pub async fn get_swarm(
        &self,
        workspace_id: i64,
        swarm_id: i64,
    ) -> Result<Option<DbSwarm>, OrchestrationError> {
        ractor::call!(self.actor, DbMessage::GetSwarm, workspace_id, swarm_id)
            .map_err(|e| OrchestrationError::Rpc(format!("DbActor GetSwarm rpc failed: {e}")))?
    }

    pub async fn get_workspace_swarm(
        &self,
        workspace_id: i64,
    ) -> Result<Option<DbSwarm>, OrchestrationError> {
        ractor::call!(self.actor, DbMessage::GetWorkspaceSwarm, workspace_id).map_err(|e| {
            OrchestrationError::Rpc(format!("DbActor GetWorkspaceSwarm rpc failed: {e}"))
        })?
    }

    pub async fn get_primary_repository(
        &self,
        workspace_id: i64,
    ) -> Result<Option<DbRepository>, OrchestrationError> {
        ractor::call!(self.actor, DbMessage::GetPrimaryRepository, workspace_id).map_err(|e| {
            OrchestrationError::Rpc(format!("DbActor GetPrimaryRepository rpc failed: {e}"))
        })?
    }

    pub async fn list_repositories(
        &self,
        workspace_id: i64,
    ) -> Result<Vec<DbRepository>, OrchestrationError> {
        ractor::call!(self.actor, DbMessage::ListRepositories, workspace_id).map_err(|e| {
            OrchestrationError::Rpc(format!("DbActor ListRepositories rpc failed: {e}"))
        })?
    }

    pub async fn get_workspace_access(
        &self,
        workspace_id: i64,
        user_id: impl Into<String>,
    ) -> Result<WorkspaceAccess, OrchestrationError> {
        ractor::call!(
            self.actor,
            DbMessage::GetWorkspaceAccess,
            workspace_id,
            user_id.into()
        )
        .map_err(|e| OrchestrationError::Rpc(format!("DbActor GetWorkspaceAccess rpc failed: {e}")))?
    }

    pub async fn get_github_credential(
        &self,
        user_id: impl Into<String>,
    ) -> Result<Option<DbGithubCredential>, OrchestrationError> {
        ractor::call!(self.actor, DbMessage::GetGithubCredential, user_id.into()).map_err(|e| {
            OrchestrationError::Rpc(format!("DbActor GetGithubCredential rpc failed: {e}"))
        })?
    }

    pub async fn patch_swarm(
        &self,
        swarm_id: i64,
        patch: SwarmPatch,
    ) -> Result<(), OrchestrationError> {
        ractor::call!(self.actor, DbMessage::PatchSwarm, swarm_id, patch)
            .map_err(|e| OrchestrationError::Rpc(format!("DbActor PatchSwarm rpc failed: {e}")))?
    }
}

struct DbActorState {
    pool: SqlitePool,
}

struct DbActor;

#[ractor::async_trait]
impl Actor for DbActor {
    type Msg = DbMessage;
    type State = DbActorState;
    type Arguments = String;

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        database_url: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        let connect_opts = SqliteConnectOptions::from_str(database_url.as_str())
            .map_err(|e| ActorProcessingErr::from(format!("invalid database url: {e}")))?
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(5))
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .connect_with(connect_opts)
            .await
            .map_err(|e| ActorProcessingErr::from(format!("db connect failed: {e}")))?;

        apply_schema(&pool)
            .await
            .map_err(|e| ActorProcessingErr::from(format!("db schema init failed: {e}")))?;

        info!("DbActor initialized");
        Ok(DbActorState { pool })
    }

    async fn handle(
        &self,
        _myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            DbMessage::CreateWorkspace(create, reply) => {
                let res = self.create_workspace(&state.pool, create).await;
                let _ = reply.send(res);
            }
            DbMessage::CreateSwarm(create, reply) => {
                let res = self.create_swarm(&state.pool, create).await;
                let _ = reply.send(res);
            }
            DbMessage::CreateRepository(create, reply) => {
                let res = self.create_repository(&state.pool, create).await;
                let _ = reply.send(res);
            }
            DbMessage::AddWorkspaceMember(workspace_id, user_id, reply) => {
                let res = self.add_member(&state.pool, workspace_id, &user_id).await;
                let _ = reply.send(res);
            }
            DbMessage::UpsertGithubCredential(create, reply) => {
                let res = self.upsert_github_credential(&state.pool, create).await;
                let _ = reply.send(res);
            }
            DbMessage::GetWorkspace(workspace_id, reply) => {
                let res = self.get_workspace(&state.pool, workspace_id).await;
                let _ = reply.send(res);
            }
            DbMessage::GetSwarm(workspace_id, swarm_id, reply) => {
                let res = self.get_swarm(&state.pool, workspace_id, swarm_id).await;
                let _ = reply.send(res);
            }
            DbMessage::GetWorkspaceSwarm(workspace_id, reply) => {
                let res = self.get_workspace_swarm(&state.pool, workspace_id).await;
                let _ = reply.send(res);
            }
            DbMessage::GetPrimaryRepository(workspace_id, reply) => {
                let res = self.get_primary_repository(&state.pool, workspace_id).await;
                let _ = reply.send(res);
            }
            DbMessage::ListRepositories(workspace_id, reply) => {
                let res = self.list_repositories(&state.pool, workspace_id).await;
                let _ = reply.send(res);
            }
            DbMessage::GetWorkspaceAccess(workspace_id, user_id, reply) => {
                let res = self
                    .get_workspace_access(&state.pool, workspace_id, &user_id)
                    .await;
                let _ = reply.send(res);
            }
            DbMessage::GetGithubCredential(user_id, reply) => {
                let res = self.get_github_credential(&state.pool, &user_id).await;
                let _ = reply.send(res);
            }
            DbMessage::PatchSwarm(swarm_id, patch, reply) => {
                let res = patch.apply(&state.pool, swarm_id).await;
                let _ = reply.send(res);
            }
        }
        Ok(())
    }
}

impl DbActor {
    async fn create_workspace(
        &self,
        pool: &SqlitePool,
        create: WorkspaceCreate,
    ) -> Result<i64, OrchestrationError> {
        let now = Utc::now();
        let id: i64 = sqlx::query_scalar(
            r#"
        INSERT INTO workspaces (slug, owner_user_id, created_at, updated_at)
        VALUES (?, ?, ?, ?)
        RETURNING id
        "#,
        )
        .bind(create.slug)
        .bind(create.owner_user_id)
        .bind(now)
        .bind(now)
        .fetch_one(pool)
        .await?;

        Ok(id)
    }

    async fn create_swarm(
        &self,
        pool: &SqlitePool,
        create: SwarmCreate,
    ) -> Result<i64, OrchestrationError> {
        let now = Utc::now();
        let id: i64 = sqlx::query_scalar(
            r#"
        INSERT INTO swarms (
            workspace_id, pool_name, pool_api_key, pool_state, container_files,
            environment_variables, created_at, updated_at
        )
        VALUES (?, ?, ?, 'UNSET', ?, ?, ?, ?)
        RETURNING id
        "#,
        )
        .bind(create.workspace_id)
        .bind(create.pool_name)
        .bind(create.pool_api_key)
        .bind(create.container_files)
        .bind(create.environment_variables)
        .bind(now)
        .bind(now)
        .fetch_one(pool)
        .await?;

        Ok(id)
    }

    async fn create_repository(
        &self,
        pool: &SqlitePool,
        create: RepositoryCreate,
    ) -> Result<i64, OrchestrationError> {
        let now = Utc::now();
        let id: i64 = sqlx::query_scalar(
            r#"
        INSERT INTO repositories (workspace_id, repository_url, branch, created_at)
        VALUES (?, ?, ?, ?)
        RETURNING id
        "#,
        )
        .bind(create.workspace_id)
        .bind(create.repository_url)
        .bind(create.branch)
        .bind(now)
        .fetch_one(pool)
        .await?;

        Ok(id)
    }

    async fn add_member(
        &self,
        pool: &SqlitePool,
        workspace_id: i64,
        user_id: &str,
    ) -> Result<(), OrchestrationError> {
        let now = Utc::now();
        sqlx::query(
            r#"
        INSERT INTO workspace_members (workspace_id, user_id, created_at)
        VALUES (?, ?, ?)
        ON CONFLICT(workspace_id, user_id) DO NOTHING
        "#,
        )
        .bind(workspace_id)
        .bind(user_id)
        .bind(now)
        .execute(pool)
        .await?;

        Ok(())
    }

    async fn upsert_github_credential(
        &self,
        pool: &SqlitePool,
        create: GithubCredentialCreate,
    ) -> Result<i64, OrchestrationError> {
        let now = Utc::now();
        let id: i64 = sqlx::query_scalar(
            r#"
        INSERT INTO github_credentials (user_id, username, token, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT(user_id) DO UPDATE SET
            username = excluded.username,
            token = excluded.token,
            updated_at = excluded.updated_at
        RETURNING id
        "#,
        )
        .bind(create.user_id)
        .bind(create.username)
        .bind(create.token)
        .bind(now)
        .bind(now)
        .fetch_one(pool)
        .await?;

        Ok(id)
    }

    async fn get_workspace(
        &self,
        pool: &SqlitePool,
        workspace_id: i64,
    ) -> Result<Option<DbWorkspace>, OrchestrationError> {
        let row = sqlx::query_as::<_, DbWorkspace>(
            r#"
        SELECT id, slug, owner_user_id, created_at, updated_at
        FROM workspaces
        WHERE id = ?
        "#,
        )
        .bind(workspace_id)
        .fetch_optional(pool)
        .await?;

        Ok(row)
    }

    async fn get_swarm(
        &self,
        pool: &SqlitePool,
        workspace_id: i64,
        swarm_id: i64,
    ) -> Result<Option<DbSwarm>, OrchestrationError> {
        let row = sqlx::query_as::<_, DbSwarm>(
            r#"
        SELECT id, workspace_id, pool_name, pool_api_key, pool_state, container_files,
               environment_variables, created_at, updated_at
        FROM swarms
        WHERE id = ? AND workspace_id = ?
        "#,
        )
        .bind(swarm_id)
        .bind(workspace_id)
        .fetch_optional(pool)
        .await?;

        Ok(row)
    }

    async fn get_workspace_swarm(
        &self,
        pool: &SqlitePool,
        workspace_id: i64,
    ) -> Result<Option<DbSwarm>, OrchestrationError> {
        let row = sqlx::query_as::<_, DbSwarm>(
            r#"
        SELECT id, workspace_id, pool_name, pool_api_key, pool_state, container_files,
               environment_variables, created_at, updated_at
        FROM swarms
        WHERE workspace_id = ?
        "#,
        )
        .bind(workspace_id)
        .fetch_optional(pool)
        .await?;

        Ok(row)
    }

    async fn get_primary_repository(
        &self,
        pool: &SqlitePool,
        workspace_id: i64,
    ) -> Result<Option<DbRepository>, OrchestrationError> {
        let row = sqlx::query_as::<_, DbRepository>(
            r#"
        SELECT id, workspace_id, repository_url, branch, created_at
        FROM repositories
        WHERE workspace_id = ?
        ORDER BY id
        LIMIT 1
        "#,
        )
        .bind(workspace_id)
        .fetch_optional(pool)
        .await?;

        Ok(row)
    }

    async fn list_repositories(
        &self,
        pool: &SqlitePool,
        workspace_id: i64,
    ) -> Result<Vec<DbRepository>, OrchestrationError> {
        let rows = sqlx::query_as::<_, DbRepository>(
            r#"
        SELECT id, workspace_id, repository_url, branch, created_at
        FROM repositories
        WHERE workspace_id = ?
        ORDER BY id
        "#,
        )
        .bind(workspace_id)
        .fetch_all(pool)
        .await?;

        Ok(rows)
    }

    async fn get_workspace_access(
        &self,
        pool: &SqlitePool,
        workspace_id: i64,
        user_id: &str,
    ) -> Result<WorkspaceAccess, OrchestrationError> {
        let (is_owner, is_member): (bool, bool) = sqlx::query_as(
            r#"
        SELECT
            EXISTS(SELECT 1 FROM workspaces WHERE id = ? AND owner_user_id = ?),
            EXISTS(SELECT 1 FROM workspace_members WHERE workspace_id = ? AND user_id = ?)
        "#,
        )
        .bind(workspace_id)
        .bind(user_id)
        .bind(workspace_id)
        .bind(user_id)
        .fetch_one(pool)
        .await?;

        Ok(WorkspaceAccess {
            is_owner,
            is_member,
        })
    }

    async fn get_github_credential(
        &self,
        pool: &SqlitePool,
        user_id: &str,
    ) -> Result<Option<DbGithubCredential>, OrchestrationError> {
        let row = sqlx::query_as::<_, DbGithubCredential>(
            r#"
        SELECT id, user_id, username, token, created_at, updated_at
        FROM github_credentials
        WHERE user_id = ?
        "#,
        )
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        Ok(row)
    }
}

/// Spawn the database actor and return a cloneable handle.
///
/// Unnamed so several instances (one per test database) can coexist in one
/// process.
pub async fn spawn(database_url: &str) -> DbHandle {
    let (actor, _jh) = ractor::Actor::spawn(None, DbActor, database_url.to_string())
        .await
        .expect("failed to spawn DbActor");

    DbHandle { actor }
}

async fn apply_schema(pool: &SqlitePool) -> Result<(), OrchestrationError> {
    for stmt in SQLITE_INIT.split(';') {
        let s = stmt.trim();
        if s.is_empty() {
            continue;
        }
        sqlx::query(s).execute(pool).await?;
    }
    Ok(())
}
