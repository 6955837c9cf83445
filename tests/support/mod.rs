//! Shared harness for the route tests: a scripted control plane, a temp
//! sqlite database per test, and request/seed helpers.
#![allow(dead_code)]

use async_trait::async_trait;
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, Response, StatusCode};
use podbay::config::Config;
use podbay::db::{DbHandle, GithubCredentialCreate, RepositoryCreate, SwarmCreate, WorkspaceCreate};
use podbay::orchestration::POOL_API_KEY_FIELD;
use podbay::pool_control::{PoolControl, PoolControlError};
use podbay::vault::SecretVault;
use podbay_schema::{
    CreatePoolRequest, PodDescriptor, PodRepository, PoolApiErrorBody, PoolDescriptor,
};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

pub const SERVICE_KEY: &str = "test-service-key";
pub const MASTER_KEY: &str = "0123456789abcdef0123456789abcdef";
pub const OWNER: &str = "user-1";

#[derive(Default)]
pub struct Calls {
    pub create: AtomicUsize,
    pub provision: AtomicUsize,
    pub inspect: AtomicUsize,
    pub drop: AtomicUsize,
    pub update_repositories: AtomicUsize,
}

/// Control plane double with scriptable outcomes and call counters.
#[derive(Default)]
pub struct ScriptedPoolControl {
    /// `(status, service, message)` returned by create_pool when set.
    pub fail_create: Option<(u16, &'static str, &'static str)>,

    /// Key returned by provisioning; `None` makes provisioning fail.
    pub minted_key: Option<String>,

    /// Pod returned by inspect; `None` makes inspect fail.
    pub pod: Option<PodDescriptor>,

    pub fail_update_repositories: bool,

    /// `(status, service, message)` returned by drop_pod when set.
    pub fail_drop: Option<(u16, &'static str, &'static str)>,

    pub calls: Calls,
    pub last_create_request: Mutex<Option<CreatePoolRequest>>,
}

impl ScriptedPoolControl {
    fn api_error(status: u16, service: &str, message: &str) -> PoolControlError {
        PoolControlError::Api {
            status: StatusCode::from_u16(status).expect("valid status code"),
            body: PoolApiErrorBody {
                message: Some(message.to_string()),
                status: Some(status),
                service: Some(service.to_string()),
                details: None,
                extra: Default::default(),
            },
        }
    }
}

#[async_trait]
impl PoolControl for ScriptedPoolControl {
    async fn create_pool(
        &self,
        request: &CreatePoolRequest,
        _api_key: &str,
    ) -> Result<PoolDescriptor, PoolControlError> {
        self.calls.create.fetch_add(1, Ordering::SeqCst);
        *self.last_create_request.lock().expect("lock poisoned") = Some(request.clone());

        if let Some((status, service, message)) = self.fail_create {
            return Err(Self::api_error(status, service, message));
        }

        Ok(PoolDescriptor {
            name: request.name.clone(),
            state: Some("ready".to_string()),
            vm_count: Some(request.min_vm_count),
            extra: Default::default(),
        })
    }

    async fn provision_api_key(&self, _pool_name: &str) -> Result<String, PoolControlError> {
        self.calls.provision.fetch_add(1, Ordering::SeqCst);
        self.minted_key
            .clone()
            .ok_or(PoolControlError::Fallback {
                status: StatusCode::BAD_GATEWAY,
                body: "mint unavailable".to_string(),
            })
    }

    async fn get_workspace_from_pool(
        &self,
        _pool_name: &str,
        _api_key: &str,
    ) -> Result<PodDescriptor, PoolControlError> {
        self.calls.inspect.fetch_add(1, Ordering::SeqCst);
        self.pod.clone().ok_or(PoolControlError::Fallback {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: "no pod".to_string(),
        })
    }

    async fn drop_pod(
        &self,
        _pool_name: &str,
        _pod_id: &str,
        _api_key: &str,
    ) -> Result<(), PoolControlError> {
        self.calls.drop.fetch_add(1, Ordering::SeqCst);
        if let Some((status, service, message)) = self.fail_drop {
            return Err(Self::api_error(status, service, message));
        }
        Ok(())
    }

    async fn update_pod_repositories(
        &self,
        _control_url: &str,
        _password: &str,
        _repositories: &[PodRepository],
    ) -> Result<(), PoolControlError> {
        self.calls.update_repositories.fetch_add(1, Ordering::SeqCst);
        if self.fail_update_repositories {
            return Err(PoolControlError::Fallback {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                body: "reset failed".to_string(),
            });
        }
        Ok(())
    }
}

pub fn test_config() -> Config {
    let mut cfg = Config::default();
    cfg.basic.service_key = SERVICE_KEY.to_string();
    cfg.vault.master_key = MASTER_KEY.to_string();
    cfg
}

pub fn temp_db_path(tag: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time before UNIX_EPOCH")
        .as_nanos();

    let mut path = std::env::temp_dir();
    path.push(format!(
        "podbay-{tag}-{}-{}.sqlite",
        std::process::id(),
        nanos
    ));
    path
}

/// Build a router over a fresh temp database and the scripted control
/// plane. Returns the db handle for seeding/asserting and the temp path
/// for cleanup.
pub async fn test_app(
    tag: &str,
    control: Arc<ScriptedPoolControl>,
    cfg: &Config,
) -> (Router, DbHandle, PathBuf) {
    let path = temp_db_path(tag);
    let database_url = format!("sqlite:{}", path.display());
    let db = podbay::db::spawn(&database_url).await;

    let control: Arc<dyn PoolControl> = control;
    let state = podbay::server::PodbayState::new(db.clone(), control, cfg);
    (podbay::server::podbay_router(state), db, path)
}

/// Seed a workspace owned by [`OWNER`] with a swarm and a GitHub
/// credential (stored as pre-vault plaintext). Returns (workspace_id,
/// swarm_id).
pub async fn seed_workspace(db: &DbHandle, pool_name: &str) -> (i64, i64) {
    seed_workspace_with(db, pool_name, None, None).await
}

/// Same as [`seed_workspace`], with control over the swarm's stored key
/// and container files.
pub async fn seed_workspace_with(
    db: &DbHandle,
    pool_name: &str,
    pool_api_key: Option<String>,
    container_files: Option<String>,
) -> (i64, i64) {
    let workspace_id = db
        .create_workspace(WorkspaceCreate {
            slug: "acme".to_string(),
            owner_user_id: OWNER.to_string(),
        })
        .await
        .expect("create workspace");

    let swarm_id = db
        .create_swarm(SwarmCreate {
            workspace_id,
            pool_name: pool_name.to_string(),
            pool_api_key,
            container_files,
            environment_variables: None,
        })
        .await
        .expect("create swarm");

    db.upsert_github_credential(GithubCredentialCreate {
        user_id: OWNER.to_string(),
        username: "octocat".to_string(),
        token: "ghp_plain_token".to_string(),
    })
    .await
    .expect("github credential");

    (workspace_id, swarm_id)
}

pub async fn seed_repository(db: &DbHandle, workspace_id: i64, url: &str, branch: &str) -> i64 {
    db.create_repository(RepositoryCreate {
        workspace_id,
        repository_url: url.to_string(),
        branch: branch.to_string(),
    })
    .await
    .expect("create repository")
}

/// Encrypt a pool API key the way production seeding would.
pub fn sealed_pool_key(plaintext: &str) -> String {
    SecretVault::new(MASTER_KEY)
        .expect("test master key")
        .encrypt(POOL_API_KEY_FIELD, plaintext)
        .expect("encrypt test key")
}

pub fn authed_request(method: &str, uri: &str, user: &str, body: Body) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", format!("Bearer {SERVICE_KEY}"))
        .header("x-user-id", user)
        .header("content-type", "application/json")
        .body(body)
        .expect("failed to build request")
}

pub async fn read_json(resp: Response<Body>) -> serde_json::Value {
    let body = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("failed to read response body");
    serde_json::from_slice(&body).expect("response body was not json")
}
