use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use podbay_schema::PoolDescriptor;
use serde::Deserialize;

use crate::error::OrchestrationError;
use crate::orchestration::{DropOutcome, PoolCreateRequest};
use crate::server::guards::auth::Caller;
use crate::server::router::PodbayState;

pub(crate) async fn create_pool(
    State(state): State<PodbayState>,
    Caller(user_id): Caller,
    Path((workspace_id, swarm_id)): Path<(i64, i64)>,
    Json(body): Json<PoolCreateRequest>,
) -> Result<impl IntoResponse, OrchestrationError> {
    let descriptor: PoolDescriptor = state
        .orchestrator
        .create_pool(&user_id, workspace_id, swarm_id, body)
        .await?;

    Ok((StatusCode::CREATED, Json(descriptor)))
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct DropQuery {
    #[serde(default)]
    reset_to_latest: bool,
}

pub(crate) async fn drop_pod(
    State(state): State<PodbayState>,
    Caller(user_id): Caller,
    Path(workspace_id): Path<i64>,
    Query(query): Query<DropQuery>,
) -> Result<Json<DropOutcome>, OrchestrationError> {
    let outcome = state
        .lifecycle
        .drop_pod(&user_id, workspace_id, query.reset_to_latest)
        .await?;

    Ok(Json(outcome))
}
