//! Database module: models and schema for persistent storage.
//!
//! Layout:
//! - `models.rs`: Rust structs mirroring DB rows
//! - `schema.rs`: SQL DDL for initializing the database (SQLite-first)
//! - `patch.rs`: create/patch payloads and their SQL
//! - `actor.rs`: the actor owning the connection pool

pub mod actor;
pub mod models;
pub mod patch;
pub mod schema;

pub use models::{
    DbGithubCredential, DbRepository, DbSwarm, DbWorkspace, PoolState, WorkspaceAccess,
};
pub use patch::{
    GithubCredentialCreate, RepositoryCreate, SwarmCreate, SwarmPatch, WorkspaceCreate,
};
pub use schema::SQLITE_INIT;

pub use actor::{DbHandle, spawn};
