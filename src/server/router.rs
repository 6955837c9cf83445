use crate::config::Config;
use crate::db::DbHandle;
use crate::orchestration::{
    CredentialStore, DbAuthorizationGuard, DbGithubCredentials, PodLifecycleManager,
    PoolOrchestrator,
};
use crate::pool_control::PoolControl;
use crate::server::routes;
use crate::vault::SecretVault;

use axum::{
    Router,
    extract::Request,
    http::{HeaderName, HeaderValue, StatusCode},
    middleware::{self, Next},
    response::Response,
    routing::{delete, post},
};
use base64::Engine as _;
use rand::RngCore;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

const MAX_REQUEST_ID_LEN: usize = 128;
const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

fn generate_request_id() -> String {
    // 96 bits => 16 chars base64url (no padding).
    let mut bytes = [0u8; 12];
    rand::rng().fill_bytes(&mut bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

#[derive(Clone)]
pub struct PodbayState {
    pub db: DbHandle,
    pub orchestrator: Arc<PoolOrchestrator>,
    pub lifecycle: Arc<PodLifecycleManager>,
    pub service_key: Arc<str>,
}

impl PodbayState {
    pub fn new(db: DbHandle, control: Arc<dyn PoolControl>, cfg: &Config) -> Self {
        let vault = Arc::new(
            SecretVault::new(cfg.vault.master_key.clone())
                .expect("vault.master_key must be at least 32 bytes"),
        );

        let credentials = CredentialStore::new(db.clone(), vault.clone(), control.clone());
        let authz = Arc::new(DbAuthorizationGuard::new(db.clone()));
        let github = Arc::new(DbGithubCredentials::new(db.clone(), vault.clone()));

        let orchestrator = Arc::new(PoolOrchestrator::new(
            db.clone(),
            vault.clone(),
            control.clone(),
            credentials.clone(),
            authz.clone(),
            github,
            cfg.orchestration.clone(),
        ));

        let lifecycle = Arc::new(PodLifecycleManager::new(
            db.clone(),
            vault,
            control,
            credentials,
            authz,
            cfg.orchestration.clone(),
        ));

        Self {
            db,
            orchestrator,
            lifecycle,
            service_key: Arc::from(cfg.basic.service_key.as_str()),
        }
    }
}

async fn not_found_handler() -> StatusCode {
    StatusCode::NOT_FOUND
}

async fn access_log(req: Request, next: Next) -> Response {
    // Capture request metadata before moving `req` into the handler stack.
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let request_id = req
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty() && v.len() <= MAX_REQUEST_ID_LEN)
        .map(str::to_string)
        .unwrap_or_else(generate_request_id);

    let start = Instant::now();
    let mut resp = next.run(req).await;

    // Always reflect `x-request-id` for easier correlation, even if the
    // client didn't send one.
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        resp.headers_mut().insert(X_REQUEST_ID, value);
    }

    let status = resp.status().as_u16();
    let latency_ms = start.elapsed().as_millis() as u64;

    if resp.status().is_server_error() {
        error!(status, %request_id, %method, %path, latency_ms, "request");
    } else if resp.status().is_client_error() {
        warn!(status, %request_id, %method, %path, latency_ms, "request");
    } else {
        info!(status, %request_id, %method, %path, latency_ms, "request");
    }

    resp
}

pub fn podbay_router(state: PodbayState) -> Router {
    Router::new()
        .route(
            "/workspaces/{workspace_id}/swarms/{swarm_id}/pool",
            post(routes::pods::create_pool),
        )
        .route(
            "/workspaces/{workspace_id}/pod",
            delete(routes::pods::drop_pod),
        )
        .fallback(not_found_handler)
        .with_state(state)
        .layer(middleware::from_fn(access_log))
}
