//! Proof Issuer: signs Liability Proofs for authenticated principals.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use super::header::encode_header;
use super::ledger::RedemptionLedger;
use super::types::{Agent, Constraints, Intent, LiabilityProof, Principal, ProofId, ProofPayload};
use crate::credential::CredentialStore;
use crate::crypto::{signing, KeyRing};
use crate::error::{ProofError, Result};

/// Lifetime of a proof when the request does not name one.
pub const DEFAULT_EXPIRES_IN_SECS: i64 = 300;

/// Largest `max_ttl_secs` an issuer accepts: ten years.
pub const MAX_TTL_CEILING_SECS: i64 = 10 * 365 * 86_400;

/// Issuer limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuerConfig {
    /// Longest lifetime a proof may be issued with, inclusive.
    pub max_ttl_secs: i64,
}

impl Default for IssuerConfig {
    fn default() -> Self {
        Self {
            max_ttl_secs: 86_400,
        }
    }
}

impl IssuerConfig {
    /// Reject a lifetime bound outside `1..=MAX_TTL_CEILING_SECS`.
    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_TTL_CEILING_SECS).contains(&self.max_ttl_secs) {
            return Err(ProofError::InvalidExpiry(format!(
                "max_ttl_secs must be within 1..={MAX_TTL_CEILING_SECS}, got {}",
                self.max_ttl_secs
            )));
        }
        Ok(())
    }
}

/// Everything needed to issue one proof.
#[derive(Debug, Clone)]
pub struct ProofRequest {
    pub principal: Principal,
    pub agent: Agent,
    pub intent: Intent,
    pub constraints: Option<Constraints>,
    pub expires_in_seconds: i64,
}

impl ProofRequest {
    pub fn new(principal: Principal, agent: Agent, intent: Intent) -> Self {
        Self {
            principal,
            agent,
            intent,
            constraints: None,
            expires_in_seconds: DEFAULT_EXPIRES_IN_SECS,
        }
    }

    /// Attach constraints.
    pub fn with_constraints(mut self, constraints: Constraints) -> Self {
        self.constraints = Some(constraints);
        self
    }

    /// Set the proof lifetime in seconds.
    pub fn expires_in(mut self, seconds: i64) -> Self {
        self.expires_in_seconds = seconds;
        self
    }

    fn validate(&self, max_ttl_secs: i64) -> Result<()> {
        require("principal.id", &self.principal.id)?;
        require("principal.credentialId", &self.principal.credential_id)?;
        require("agent.id", &self.agent.id)?;
        require("intent.action", &self.intent.action)?;
        require("intent.target.service", &self.intent.target.service)?;

        if self.expires_in_seconds <= 0 || self.expires_in_seconds > max_ttl_secs {
            return Err(ProofError::InvalidExpiry(format!(
                "expires_in_seconds must be within 1..={max_ttl_secs}, got {}",
                self.expires_in_seconds
            )));
        }

        if let Some(constraints) = &self.constraints {
            constraints.validate()?;
        }
        Ok(())
    }
}

fn require(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ProofError::InvalidRequest(format!("{field} is required")));
    }
    Ok(())
}

/// Issues signed proofs with the key ring's active key.
pub struct ProofIssuer {
    keys: Arc<KeyRing>,
    credentials: Arc<dyn CredentialStore>,
    ledger: Arc<RedemptionLedger>,
    config: IssuerConfig,
}

impl ProofIssuer {
    pub fn new(
        keys: Arc<KeyRing>,
        credentials: Arc<dyn CredentialStore>,
        ledger: Arc<RedemptionLedger>,
        config: IssuerConfig,
    ) -> Self {
        Self {
            keys,
            credentials,
            ledger,
            config,
        }
    }

    pub fn config(&self) -> &IssuerConfig {
        &self.config
    }

    /// Issue a proof valid from now.
    pub fn create(&self, request: ProofRequest) -> Result<LiabilityProof> {
        self.create_at(request, crate::time::now())
    }

    /// Issue a proof with `issued_at = now`.
    ///
    /// The request is validated and the principal authenticated before
    /// anything is signed. The device attestation only gates issuance and
    /// is not carried in the signed payload. Single-use proofs are
    /// registered in the redemption ledger as unredeemed.
    pub fn create_at(&self, request: ProofRequest, now: DateTime<Utc>) -> Result<LiabilityProof> {
        request.validate(self.config.max_ttl_secs)?;
        self.credentials.authenticate(&request.principal)?;

        let expires_at = TimeDelta::try_seconds(request.expires_in_seconds)
            .and_then(|ttl| now.checked_add_signed(ttl))
            .ok_or_else(|| {
                ProofError::InvalidExpiry(format!(
                    "expires_in_seconds {} is out of range",
                    request.expires_in_seconds
                ))
            })?;
        let mut principal = request.principal;
        principal.device_attestation = None;

        let payload = ProofPayload {
            proof_id: ProofId::generate(),
            principal,
            agent: request.agent,
            intent: request.intent,
            constraints: request.constraints.unwrap_or_default(),
            issued_at: now,
            expires_at,
        };
        let payload_bytes = payload.to_bytes()?;

        let key = self.keys.active();
        let signature = key.sign(&payload_bytes);
        let header = encode_header(key.kid(), &payload_bytes, &signature);

        if payload.constraints.single_use {
            self.ledger.register(&payload.proof_id, expires_at);
        }

        log::info!(
            "issued proof {} principal={} agent={} action={} kid={}",
            payload.proof_id,
            payload.principal.id,
            payload.agent.id,
            payload.intent.action,
            key.kid()
        );

        Ok(LiabilityProof {
            payload,
            kid: key.kid().clone(),
            signature: signing::encode_signature(&signature),
            header,
        })
    }
}

impl std::fmt::Debug for ProofIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProofIssuer")
            .field("keys", &self.keys)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
