//! SQL DDL for initializing the database schema.
//! SQLite-first design; can be adapted for other RDBMS.

/// SQLite schema includes:
/// - `workspaces` table (one row per project workspace)
/// - `workspace_members` table (one (workspace_id, user_id) per row)
/// - `repositories` table (zero or more per workspace; the primary
///   repository is the first by creation order)
/// - `swarms` table (sandbox configuration, one per workspace)
/// - `github_credentials` table (one row per user)
pub const SQLITE_INIT: &str = r#"
-- ---------------------------------------------------------------------------
-- Workspaces
-- ---------------------------------------------------------------------------
CREATE TABLE IF NOT EXISTS workspaces (
    id INTEGER PRIMARY KEY NOT NULL,
    slug TEXT NOT NULL,
    owner_user_id TEXT NOT NULL,
    created_at TEXT NOT NULL, -- RFC3339
    updated_at TEXT NOT NULL, -- RFC3339
    UNIQUE(slug)
);

-- ---------------------------------------------------------------------------
-- Workspace membership (owner is implicit, not duplicated here)
-- ---------------------------------------------------------------------------
CREATE TABLE IF NOT EXISTS workspace_members (
    id INTEGER PRIMARY KEY NOT NULL,
    workspace_id INTEGER NOT NULL REFERENCES workspaces(id),
    user_id TEXT NOT NULL,
    created_at TEXT NOT NULL, -- RFC3339
    UNIQUE(workspace_id, user_id)
);

CREATE INDEX IF NOT EXISTS idx_members_workspace ON workspace_members(workspace_id);

-- ---------------------------------------------------------------------------
-- Repositories (primary = lowest id per workspace)
-- ---------------------------------------------------------------------------
CREATE TABLE IF NOT EXISTS repositories (
    id INTEGER PRIMARY KEY NOT NULL,
    workspace_id INTEGER NOT NULL REFERENCES workspaces(id),
    repository_url TEXT NOT NULL,
    branch TEXT NOT NULL,
    created_at TEXT NOT NULL -- RFC3339
);

CREATE INDEX IF NOT EXISTS idx_repositories_workspace ON repositories(workspace_id);

-- ---------------------------------------------------------------------------
-- Swarms (sandbox configuration, one per workspace)
-- ---------------------------------------------------------------------------
CREATE TABLE IF NOT EXISTS swarms (
    id INTEGER PRIMARY KEY NOT NULL,
    workspace_id INTEGER NOT NULL REFERENCES workspaces(id),
    pool_name TEXT NOT NULL,
    pool_api_key TEXT NULL,             -- encrypted blob
    pool_state TEXT NOT NULL DEFAULT 'UNSET',
    container_files TEXT NULL,          -- JSON object: path -> content
    environment_variables TEXT NULL,    -- JSON array of {name, value}
    created_at TEXT NOT NULL, -- RFC3339
    updated_at TEXT NOT NULL, -- RFC3339
    UNIQUE(workspace_id)
);

-- ---------------------------------------------------------------------------
-- GitHub credentials (one per user, token is an encrypted blob)
-- ---------------------------------------------------------------------------
CREATE TABLE IF NOT EXISTS github_credentials (
    id INTEGER PRIMARY KEY NOT NULL,
    user_id TEXT NOT NULL,
    username TEXT NOT NULL,
    token TEXT NOT NULL,
    created_at TEXT NOT NULL, -- RFC3339
    updated_at TEXT NOT NULL, -- RFC3339
    UNIQUE(user_id)
);
"#;
