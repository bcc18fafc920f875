//! Request handlers for the AgentProof API

mod dns;
mod proof;

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};

use agentproof::credential::CredentialSeed;
use agentproof::CredentialStore;

pub use crate::state::AppState;
pub use dns::{register, resolve, revoke};
pub use proof::{create_proof, verify_proof};

use crate::dto::{optional, required, CredentialBody, KeysResponse, SuccessResponse};
use crate::error::ApiError;

/// List the keys proofs can be verified with
///
/// GET /api/v1/keys
pub async fn list_keys(State(state): State<Arc<AppState>>) -> Json<KeysResponse> {
    Json(KeysResponse {
        active_kid: state.keys.active_kid().to_string(),
        keys: state.keys.public_keys(),
    })
}

/// Register a principal credential
///
/// POST /api/v1/credentials
pub async fn register_credential(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CredentialBody>, JsonRejection>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let Json(body) = payload?;
    let seed = CredentialSeed {
        id: required(body.id, "id")?,
        principal_id: required(body.principal_id, "principalId")?,
        device_attestation: optional(body.device_attestation),
    };
    let (credential_id, principal_id) = (seed.id.clone(), seed.principal_id.clone());

    state.credentials.insert(seed.into())?;
    tracing::info!(%credential_id, %principal_id, "credential registered");
    Ok(Json(SuccessResponse::ok()))
}
