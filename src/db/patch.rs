use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::debug;

use crate::db::models::PoolState;
use crate::error::OrchestrationError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceCreate {
    pub slug: String,
    pub owner_user_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwarmCreate {
    pub workspace_id: i64,
    pub pool_name: String,
    pub pool_api_key: Option<String>,
    pub container_files: Option<String>,
    pub environment_variables: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryCreate {
    pub workspace_id: i64,
    pub repository_url: String,
    pub branch: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GithubCredentialCreate {
    pub user_id: String,
    pub username: String,
    pub token: String,
}

/// Partial update of a swarm's orchestration columns. `None` fields keep
/// their current value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SwarmPatch {
    pub pool_api_key: Option<String>,
    pub pool_state: Option<PoolState>,
    pub container_files: Option<String>,
    pub environment_variables: Option<String>,
}

impl SwarmPatch {
    pub async fn apply(&self, pool: &SqlitePool, id: i64) -> Result<(), OrchestrationError> {
        let pool_api_key_set = self.pool_api_key.is_some();
        let pool_state_set = self.pool_state.is_some();
        let container_files_set = self.container_files.is_some();
        let environment_variables_set = self.environment_variables.is_some();
        let updated_at = Utc::now();

        // Use the bind query API to avoid SQLx offline cache requirements.
        let res = sqlx::query(
            r#"
            UPDATE swarms
            SET
                pool_api_key = COALESCE(?, pool_api_key),
                pool_state = COALESCE(?, pool_state),
                container_files = COALESCE(?, container_files),
                environment_variables = COALESCE(?, environment_variables),
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(self.pool_api_key.clone())
        .bind(self.pool_state)
        .bind(self.container_files.clone())
        .bind(self.environment_variables.clone())
        .bind(updated_at)
        .bind(id)
        .execute(pool)
        .await?;

        let affected = res.rows_affected();
        debug!(
            swarm_id = id,
            affected,
            updated_at = %updated_at,
            pool_api_key_set,
            pool_state_set,
            container_files_set,
            environment_variables_set,
            "swarm patch applied"
        );

        if affected == 0 {
            return Err(OrchestrationError::Internal(format!(
                "swarm not found for id={id}"
            )));
        }

        Ok(())
    }
}
