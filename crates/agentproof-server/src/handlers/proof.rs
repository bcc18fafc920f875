//! Proof issuance and verification handlers.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, State},
    http::HeaderMap,
    Json,
};

use agentproof::proof::HEADER_NAME;

use super::AppState;
use crate::dto::{optional, CreateProofBody, CreateProofResponse, VerifyBody, VerifyResponse};
use crate::error::ApiError;

/// Issue a Liability Proof
///
/// POST /api/v1/proof/create
pub async fn create_proof(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateProofBody>, JsonRejection>,
) -> Result<Json<CreateProofResponse>, ApiError> {
    let Json(body) = payload?;
    let request = body.into_request()?;

    tracing::debug!(
        principal_id = %request.principal.id,
        agent_id = %request.agent.id,
        action = %request.intent.action,
        "issuing proof"
    );

    let proof = state.issuer.create(request)?;
    Ok(Json(proof.into()))
}

/// Verify a Liability Proof
///
/// POST /api/v1/proof/verify
///
/// The proof comes from the body's `proof` field, or from the
/// `X-AgentProof` header when the body does not carry one. A proof that
/// fails verification is still a `200` with `valid: false`. Nothing but the
/// redemption ledger is touched, so replaying a reusable proof has no side
/// effects.
pub async fn verify_proof(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<VerifyResponse>, ApiError> {
    let body: VerifyBody = if body.iter().all(u8::is_ascii_whitespace) {
        VerifyBody::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ApiError::BadRequest(format!("Invalid JSON body: {e}")))?
    };

    let proof = optional(body.proof)
        .or_else(|| {
            headers
                .get(HEADER_NAME)
                .and_then(|value| value.to_str().ok())
                .map(str::to_owned)
        })
        .ok_or_else(|| ApiError::missing("proof"))?;
    let context = body.context.unwrap_or_default();

    let result = state.verifier.verify_with_context(&proof, &context);
    if result.valid {
        tracing::debug!(
            proof_id = ?result.proof_id.as_ref().map(|id| id.to_string()),
            principal_id = ?result.principal_id,
            "proof accepted"
        );
    } else {
        tracing::info!(
            proof_id = ?result.proof_id.as_ref().map(|id| id.to_string()),
            errors = ?result.errors,
            "proof rejected"
        );
    }

    Ok(Json(result.into()))
}
