//! Request and response bodies of the HTTP API.
//!
//! Field names are camelCase on the wire. Every client-supplied field is
//! optional at the serde level so that a missing or empty field becomes a
//! `400 BAD_REQUEST` naming it.

use serde::{Deserialize, Serialize};

use agentproof::crypto::keyring::PublicKeyInfo;
use agentproof::{
    Agent, Constraints, ExecutionContext, Intent, LiabilityProof, Principal, ProofRequest,
    TrustResolution, VerifyResult,
};

use crate::error::ApiError;

/// Take a required string field, treating blank as missing.
pub(crate) fn required(value: Option<String>, field: &str) -> Result<String, ApiError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ApiError::missing(field))
}

pub(crate) fn optional(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

// ---------------------------------------------------------------------------
// proof/create
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrincipalBody {
    pub id: Option<String>,
    pub credential_id: Option<String>,
    pub device_attestation: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AgentBody {
    pub id: Option<String>,
    pub name: Option<String>,
    pub version: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TargetBody {
    pub service: Option<String>,
    pub endpoint: Option<String>,
    pub method: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct IntentBody {
    pub action: Option<String>,
    pub target: Option<TargetBody>,
    pub parameters: Option<serde_json::Map<String, serde_json::Value>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProofBody {
    pub principal: Option<PrincipalBody>,
    pub agent: Option<AgentBody>,
    pub intent: Option<IntentBody>,
    pub constraints: Option<Constraints>,
    pub expires_in_seconds: Option<i64>,
}

impl CreateProofBody {
    /// Check required fields and build the issuer request.
    pub fn into_request(self) -> Result<ProofRequest, ApiError> {
        let principal = self.principal.unwrap_or_default();
        let mut bound = Principal::new(
            required(principal.id, "principal.id")?,
            required(principal.credential_id, "principal.credentialId")?,
        );
        if let Some(attestation) = optional(principal.device_attestation) {
            bound = bound.with_device_attestation(attestation);
        }

        let agent = self.agent.unwrap_or_default();
        let agent = Agent::new(
            required(agent.id, "agent.id")?,
            agent.name.unwrap_or_default(),
            agent.version.unwrap_or_default(),
        );

        let intent_body = self.intent.unwrap_or_default();
        let action = required(intent_body.action, "intent.action")?;
        let target = intent_body.target.unwrap_or_default();
        let mut intent = Intent::new(
            action,
            required(target.service, "intent.target.service")?,
            target.endpoint.unwrap_or_default(),
            target.method.unwrap_or_default(),
        );
        intent.parameters = intent_body.parameters;

        let mut request = ProofRequest::new(bound, agent, intent);
        if let Some(constraints) = self.constraints {
            request = request.with_constraints(constraints);
        }
        if let Some(seconds) = self.expires_in_seconds {
            request = request.expires_in(seconds);
        }
        Ok(request)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProofResponse {
    pub header: String,
    pub proof_id: String,
    pub expires_at: String,
}

impl From<LiabilityProof> for CreateProofResponse {
    fn from(proof: LiabilityProof) -> Self {
        Self {
            expires_at: agentproof::time::to_rfc3339(proof.expires_at()),
            proof_id: proof.proof_id().to_string(),
            header: proof.header,
        }
    }
}

// ---------------------------------------------------------------------------
// proof/verify
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
pub struct VerifyBody {
    pub proof: Option<String>,
    pub context: Option<ExecutionContext>,
}

/// Intent echo, flattened to the string map the SDK reads.
#[derive(Debug, Serialize)]
pub struct IntentEcho {
    pub action: String,
    pub service: String,
    pub endpoint: String,
    pub method: String,
}

impl From<Intent> for IntentEcho {
    fn from(intent: Intent) -> Self {
        Self {
            action: intent.action,
            service: intent.target.service,
            endpoint: intent.target.endpoint,
            method: intent.target.method,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proof_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub principal_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intent: Option<IntentEcho>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub liability_accepted_by: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<&'static str>,
}

impl From<VerifyResult> for VerifyResponse {
    fn from(result: VerifyResult) -> Self {
        Self {
            valid: result.valid,
            proof_id: result.proof_id.map(|id| id.to_string()),
            principal_id: result.principal_id,
            agent_id: result.agent_id,
            intent: result.intent.map(IntentEcho::from),
            liability_accepted_by: result.liability_accepted_by,
            errors: result.errors.iter().map(|e| e.as_str()).collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// dns
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveQuery {
    pub agent_id: Option<String>,
    pub principal_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveResponse {
    pub trusted: bool,
    pub trust_score: i64,
    pub ttl: u64,
    pub revoked: bool,
}

impl From<TrustResolution> for ResolveResponse {
    fn from(resolution: TrustResolution) -> Self {
        Self {
            trusted: resolution.trusted,
            trust_score: resolution.trust_score,
            ttl: resolution.ttl,
            revoked: resolution.revoked,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterBody {
    pub agent_id: Option<String>,
    pub principal_id: Option<String>,
    pub agent_name: Option<String>,
    pub agent_version: Option<String>,
}

impl RegisterBody {
    pub fn agent_name(&self) -> Option<String> {
        optional(self.agent_name.clone())
    }

    pub fn agent_version(&self) -> Option<String> {
        optional(self.agent_version.clone())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevokeBody {
    pub agent_id: Option<String>,
    pub principal_id: Option<String>,
    pub reason: Option<String>,
}

// ---------------------------------------------------------------------------
// credentials, keys, health
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialBody {
    pub id: Option<String>,
    pub principal_id: Option<String>,
    pub device_attestation: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    pub fn ok() -> Self {
        Self { success: true }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeysResponse {
    pub active_kid: String,
    pub keys: Vec<PublicKeyInfo>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}
