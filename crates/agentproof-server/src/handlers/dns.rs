//! Trust Registry handlers.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    Json,
};

use agentproof::TrustRegistry;

use super::AppState;
use crate::dto::{
    required, RegisterBody, ResolveQuery, ResolveResponse, RevokeBody, SuccessResponse,
};
use crate::error::ApiError;

/// Resolve trust for an agent/principal pair
///
/// GET /api/v1/dns/resolve?agentId=..&principalId=..
pub async fn resolve(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ResolveQuery>,
) -> Result<Json<ResolveResponse>, ApiError> {
    let agent_id = required(query.agent_id, "agentId")?;
    let principal_id = required(query.principal_id, "principalId")?;

    Ok(Json(state.registry.resolve(&agent_id, &principal_id).into()))
}

/// Register or refresh a pair
///
/// POST /api/v1/dns/register
pub async fn register(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RegisterBody>, JsonRejection>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let Json(body) = payload?;
    let (agent_name, agent_version) = (body.agent_name(), body.agent_version());
    let agent_id = required(body.agent_id, "agentId")?;
    let principal_id = required(body.principal_id, "principalId")?;

    let (agent, principal) = (agent_id.clone(), principal_id.clone());
    with_registry(&state, move |registry| {
        registry.register(&agent, &principal, agent_name, agent_version)
    })
    .await?;
    tracing::info!(%agent_id, %principal_id, "trust pair registered");

    Ok(Json(SuccessResponse::ok()))
}

/// Revoke a pair
///
/// POST /api/v1/dns/revoke
pub async fn revoke(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RevokeBody>, JsonRejection>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let Json(body) = payload?;
    let agent_id = required(body.agent_id, "agentId")?;
    let principal_id = required(body.principal_id, "principalId")?;
    let reason = required(body.reason, "reason")?;

    let (agent, principal, why) = (agent_id.clone(), principal_id.clone(), reason.clone());
    with_registry(&state, move |registry| registry.revoke(&agent, &principal, &why)).await?;
    tracing::warn!(%agent_id, %principal_id, %reason, "trust pair revoked");

    Ok(Json(SuccessResponse::ok()))
}

/// Run a registry mutation on the blocking pool, since it may write the
/// record to disk.
async fn with_registry<T, F>(state: &Arc<AppState>, mutate: F) -> Result<T, ApiError>
where
    F: FnOnce(&TrustRegistry) -> agentproof::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = Arc::clone(state);
    Ok(tokio::task::spawn_blocking(move || mutate(&state.registry)).await??)
}
