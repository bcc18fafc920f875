//! API error types and responses.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use agentproof::ProofError;

/// API error type
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Unknown principal: {0}")]
    UnknownPrincipal(String),

    #[error("Device attestation mismatch: {0}")]
    AttestationMismatch(String),

    #[error("Invalid expiry: {0}")]
    InvalidExpiry(String),

    #[error("Invalid constraints: {0}")]
    InvalidConstraints(String),

    #[error("Unknown trust record: agent={agent_id} principal={principal_id}")]
    UnknownTrustRecord {
        agent_id: String,
        principal_id: String,
    },

    /// Server fault. The detail is logged, never returned.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// A required field was absent or empty.
    pub fn missing(field: &str) -> Self {
        Self::BadRequest(format!("{field} is required"))
    }
}

/// API error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            ApiError::UnknownPrincipal(principal) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "UNKNOWN_PRINCIPAL",
                format!("Principal '{principal}' has no valid credential"),
            ),
            ApiError::AttestationMismatch(principal) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "ATTESTATION_MISMATCH",
                format!("Device attestation for principal '{principal}' does not match"),
            ),
            ApiError::InvalidExpiry(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "INVALID_EXPIRY",
                msg.clone(),
            ),
            ApiError::InvalidConstraints(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "INVALID_CONSTRAINTS",
                msg.clone(),
            ),
            ApiError::UnknownTrustRecord {
                agent_id,
                principal_id,
            } => (
                StatusCode::NOT_FOUND,
                "UNKNOWN_TRUST_RECORD",
                format!("No trust record for agent '{agent_id}' and principal '{principal_id}'"),
            ),
            ApiError::Internal(detail) => {
                tracing::error!(error = %detail, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "Internal server error".to_string(),
                )
            }
        };

        let body = ErrorResponse {
            error: message,
            code: code.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

impl From<ProofError> for ApiError {
    fn from(err: ProofError) -> Self {
        match err {
            ProofError::UnknownPrincipal(principal) => ApiError::UnknownPrincipal(principal),
            ProofError::AttestationMismatch(principal) => ApiError::AttestationMismatch(principal),
            ProofError::InvalidExpiry(msg) => ApiError::InvalidExpiry(msg),
            ProofError::InvalidConstraints(msg) => ApiError::InvalidConstraints(msg),
            ProofError::InvalidRequest(msg) => ApiError::BadRequest(msg),
            ProofError::UnknownTrustRecord {
                agent_id,
                principal_id,
            } => ApiError::UnknownTrustRecord {
                agent_id,
                principal_id,
            },
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        ApiError::Internal(format!("blocking task failed: {err}"))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(format!("Invalid JSON body: {}", rejection.body_text()))
    }
}
