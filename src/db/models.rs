use chrono::{DateTime, Utc};
use podbay_schema::EnvVar;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct DbWorkspace {
    pub id: i64,
    pub slug: String,
    pub owner_user_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Terminal outcome of the last pool orchestration attempt for a swarm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(rename_all = "UPPERCASE")]
pub enum PoolState {
    Unset,
    Complete,
    Failed,
}

/// Sandbox configuration record; one per workspace.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct DbSwarm {
    pub id: i64,
    pub workspace_id: i64,
    pub pool_name: String,
    /// Vault-encrypted blob, absent until provisioned.
    pub pool_api_key: Option<String>,
    pub pool_state: PoolState,
    /// JSON object: path -> file content.
    pub container_files: Option<String>,
    /// JSON array of `{name, value}` pairs.
    pub environment_variables: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DbSwarm {
    /// Stored container files, parsed. Absent or blank columns read as an
    /// empty map.
    pub fn container_files_map(&self) -> Result<BTreeMap<String, String>, serde_json::Error> {
        match self.container_files.as_deref() {
            None => Ok(BTreeMap::new()),
            Some(raw) if raw.trim().is_empty() => Ok(BTreeMap::new()),
            Some(raw) => serde_json::from_str(raw),
        }
    }

    /// Stored environment variables, parsed. Absent or blank columns read
    /// as an empty list.
    pub fn environment_variables_list(&self) -> Result<Vec<EnvVar>, serde_json::Error> {
        match self.environment_variables.as_deref() {
            None => Ok(Vec::new()),
            Some(raw) if raw.trim().is_empty() => Ok(Vec::new()),
            Some(raw) => serde_json::from_str(raw),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct DbRepository {
    pub id: i64,
    pub workspace_id: i64,
    pub repository_url: String,
    pub branch: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct DbGithubCredential {
    pub id: i64,
    pub user_id: String,
    pub username: String,
    /// Vault-encrypted blob; values stored before encryption was
    /// introduced pass through decrypt unchanged.
    pub token: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Caller's relationship to a workspace, as resolved from the membership
/// tables.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct WorkspaceAccess {
    pub is_owner: bool,
    pub is_member: bool,
}

impl WorkspaceAccess {
    pub fn allowed(&self) -> bool {
        self.is_owner || self.is_member
    }
}
