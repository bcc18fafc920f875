//! Proof Verifier.
//!
//! Verification never fails with an `Err`. Every outcome, including a
//! header that cannot be decoded, is a [`VerifyResult`] whose `errors`
//! list names each failed check.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::header::decode_header;
use super::ledger::{Redemption, RedemptionLedger};
use super::policy::{ConstraintPolicy, EmbeddedConstraintPolicy, ExecutionContext};
use super::types::{Intent, ProofId, ProofPayload};
use crate::crypto::{signing, KeyRing};

/// Allowed clock difference between issuer and verifier for `issued_at`.
pub const CLOCK_SKEW_SECS: i64 = 5;

/// A failed verification check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerifyError {
    Malformed,
    BadSignature,
    UnknownKey,
    Expired,
    NotYetValid,
    AlreadyUsed,
    AmountExceedsMax,
    RecipientNotAllowed,
    GeoFenceViolation,
    OutsideValidHours,
    ConfirmationRequired,
}

impl VerifyError {
    /// Stable wire code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Malformed => "malformed",
            Self::BadSignature => "bad_signature",
            Self::UnknownKey => "unknown_key",
            Self::Expired => "expired",
            Self::NotYetValid => "not_yet_valid",
            Self::AlreadyUsed => "already_used",
            Self::AmountExceedsMax => "amount_exceeds_max",
            Self::RecipientNotAllowed => "recipient_not_allowed",
            Self::GeoFenceViolation => "geo_fence_violation",
            Self::OutsideValidHours => "outside_valid_hours",
            Self::ConfirmationRequired => "confirmation_required",
        }
    }
}

impl std::fmt::Display for VerifyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of verifying one proof.
///
/// Identity fields are filled in whenever the signature is authentic, even
/// if another check failed. `liability_accepted_by` is only set on success.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifyResult {
    pub valid: bool,
    pub proof_id: Option<ProofId>,
    pub principal_id: Option<String>,
    pub agent_id: Option<String>,
    pub intent: Option<Intent>,
    pub liability_accepted_by: Option<String>,
    pub errors: Vec<VerifyError>,
    pub verified_at: DateTime<Utc>,
}

impl VerifyResult {
    fn rejected(error: VerifyError, verified_at: DateTime<Utc>) -> Self {
        Self {
            valid: false,
            proof_id: None,
            principal_id: None,
            agent_id: None,
            intent: None,
            liability_accepted_by: None,
            errors: vec![error],
            verified_at,
        }
    }

    fn from_payload(
        payload: ProofPayload,
        errors: Vec<VerifyError>,
        verified_at: DateTime<Utc>,
    ) -> Self {
        let valid = errors.is_empty();
        Self {
            valid,
            liability_accepted_by: valid.then(|| payload.principal.id.clone()),
            proof_id: Some(payload.proof_id),
            principal_id: Some(payload.principal.id),
            agent_id: Some(payload.agent.id),
            intent: Some(payload.intent),
            errors,
            verified_at,
        }
    }

    /// Check whether a specific check failed.
    pub fn has_error(&self, error: VerifyError) -> bool {
        self.errors.contains(&error)
    }
}

/// Checks headers produced by a [`ProofIssuer`](super::ProofIssuer)
/// sharing the same key ring and ledger.
pub struct ProofVerifier {
    keys: Arc<KeyRing>,
    ledger: Arc<RedemptionLedger>,
    policy: Arc<dyn ConstraintPolicy>,
}

impl ProofVerifier {
    pub fn new(keys: Arc<KeyRing>, ledger: Arc<RedemptionLedger>) -> Self {
        Self {
            keys,
            ledger,
            policy: Arc::new(EmbeddedConstraintPolicy),
        }
    }

    /// Replace the constraint policy.
    pub fn with_policy(mut self, policy: impl ConstraintPolicy + 'static) -> Self {
        self.policy = Arc::new(policy);
        self
    }

    /// Verify a header at the current time.
    pub fn verify(&self, header: &str) -> VerifyResult {
        self.verify_at(header, crate::time::now())
    }

    /// Verify a header as of `now`.
    pub fn verify_at(&self, header: &str, now: DateTime<Utc>) -> VerifyResult {
        self.check(header, &ExecutionContext::default(), now)
    }

    /// Verify a header against the live values of the transaction it
    /// authorizes.
    pub fn verify_with_context(&self, header: &str, context: &ExecutionContext) -> VerifyResult {
        self.check(header, context, crate::time::now())
    }

    /// [`verify_with_context`](Self::verify_with_context) as of `now`.
    pub fn verify_with_context_at(
        &self,
        header: &str,
        context: &ExecutionContext,
        now: DateTime<Utc>,
    ) -> VerifyResult {
        self.check(header, context, now)
    }

    fn check(&self, header: &str, context: &ExecutionContext, now: DateTime<Utc>) -> VerifyResult {
        let decoded = match decode_header(header) {
            Ok(decoded) => decoded,
            Err(e) => {
                log::debug!("rejecting proof header: {e}");
                return VerifyResult::rejected(VerifyError::Malformed, now);
            }
        };

        let Some(verifying_key) = self.keys.verifying_key(&decoded.kid) else {
            log::debug!("rejecting proof signed by unknown key {}", decoded.kid);
            return VerifyResult::rejected(VerifyError::UnknownKey, now);
        };

        if signing::verify(&verifying_key, &decoded.payload_bytes, &decoded.signature).is_err() {
            return VerifyResult::rejected(VerifyError::BadSignature, now);
        }

        // Authentic bytes that do not parse came from a different payload schema.
        let payload = match decoded.payload() {
            Ok(payload) => payload,
            Err(e) => {
                log::warn!("signed payload failed to parse: {e}");
                return VerifyResult::rejected(VerifyError::Malformed, now);
            }
        };

        let mut errors = Vec::new();
        if now > payload.expires_at {
            errors.push(VerifyError::Expired);
        }
        if now + Duration::seconds(CLOCK_SKEW_SECS) < payload.issued_at {
            errors.push(VerifyError::NotYetValid);
        }
        errors.extend(self.policy.evaluate(&payload, context, now));

        if payload.constraints.single_use {
            if errors.is_empty() {
                match self.ledger.redeem(&payload.proof_id, now) {
                    Redemption::Redeemed => {}
                    Redemption::AlreadyUsed => errors.push(VerifyError::AlreadyUsed),
                    Redemption::Unknown => {
                        log::warn!(
                            "single-use proof {} missing from ledger; treating as used",
                            payload.proof_id
                        );
                        errors.push(VerifyError::AlreadyUsed);
                    }
                }
            } else if self.ledger.is_redeemed(&payload.proof_id) == Some(true) {
                errors.push(VerifyError::AlreadyUsed);
            }
        }

        if !errors.is_empty() {
            log::debug!("proof {} failed verification: {:?}", payload.proof_id, errors);
        }
        VerifyResult::from_payload(payload, errors, now)
    }
}

impl std::fmt::Debug for ProofVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProofVerifier")
            .field("keys", &self.keys)
            .finish_non_exhaustive()
    }
}
