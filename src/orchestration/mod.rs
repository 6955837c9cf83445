//! The two pod orchestration workflows and their collaborator seams.

mod access;
mod create;
mod credentials;
mod drop;

pub use access::{
    AuthorizationGuard, DbAuthorizationGuard, DbGithubCredentials, GITHUB_TOKEN_FIELD,
    GithubCredentialResolver, GithubIdentity,
};
pub use create::{PoolCreateRequest, PoolOrchestrator};
pub use credentials::{CredentialStore, POOL_API_KEY_FIELD};
pub use drop::{DROP_CONFIRMATION, DropOutcome, PodLifecycleManager};
