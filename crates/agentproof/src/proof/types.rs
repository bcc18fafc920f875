//! Liability Proof data model.
//!
//! A proof binds a principal (who is accountable), an agent (the acting
//! software), and an intent (what it is about to do) under optional
//! constraints and an expiry window.

use std::collections::BTreeSet;

use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::crypto::KeyId;
use crate::error::{ProofError, Result};

/// Unique identifier for a Liability Proof.
///
/// Format: `apf_` + base58 of 16 random bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProofId(pub String);

impl ProofId {
    /// Generate a fresh random proof ID.
    pub fn generate() -> Self {
        let bytes: [u8; 16] = crate::crypto::random::random_bytes();
        Self(format!("apf_{}", bs58::encode(bytes).into_string()))
    }
}

impl std::fmt::Display for ProofId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The accountable party.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: String,
    /// Reference into the credential store.
    pub credential_id: String,
    /// Opaque device attestation blob. Checked at issuance and stripped
    /// from the signed payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_attestation: Option<String>,
}

impl Principal {
    pub fn new(id: impl Into<String>, credential_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            credential_id: credential_id.into(),
            device_attestation: None,
        }
    }

    pub fn with_device_attestation(mut self, attestation: impl Into<String>) -> Self {
        self.device_attestation = Some(attestation.into());
        self
    }
}

/// The acting software.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
    pub id: String,
    pub name: String,
    pub version: String,
}

impl Agent {
    pub fn new(id: impl Into<String>, name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            version: version.into(),
        }
    }
}

/// Where an intent is directed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentTarget {
    pub service: String,
    pub endpoint: String,
    pub method: String,
}

/// What the agent is about to do.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intent {
    /// Action verb, e.g. `transfer`.
    pub action: String,
    pub target: IntentTarget,
    /// Free-form parameters of the action.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<serde_json::Map<String, serde_json::Value>>,
}

impl Intent {
    pub fn new(
        action: impl Into<String>,
        service: impl Into<String>,
        endpoint: impl Into<String>,
        method: impl Into<String>,
    ) -> Self {
        Self {
            action: action.into(),
            target: IntentTarget {
                service: service.into(),
                endpoint: endpoint.into(),
                method: method.into(),
            },
            parameters: None,
        }
    }

    /// Add one parameter.
    pub fn with_parameter(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.parameters
            .get_or_insert_with(serde_json::Map::new)
            .insert(key.into(), value);
        self
    }

    /// Look up a parameter by name.
    pub fn parameter(&self, key: &str) -> Option<&serde_json::Value> {
        self.parameters.as_ref().and_then(|p| p.get(key))
    }
}

/// Time-of-day window in UTC hours. `end` is exclusive; a window with
/// `start > end` wraps past midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidHours {
    pub start: u8,
    pub end: u8,
}

impl ValidHours {
    /// Check whether an hour of the day (0..=23) falls in the window.
    pub fn contains_hour(&self, hour: u8) -> bool {
        if self.start < self.end {
            hour >= self.start && hour < self.end
        } else {
            hour >= self.start || hour < self.end
        }
    }

    /// Check whether an instant falls in the window.
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        // hour() is always 0..=23
        self.contains_hour(at.hour() as u8)
    }
}

/// Bounds on what a proof authorizes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Constraints {
    #[serde(
        default,
        alias = "maxAmount",
        skip_serializing_if = "Option::is_none"
    )]
    pub max_amount: Option<f64>,

    #[serde(
        default,
        alias = "allowedRecipients",
        skip_serializing_if = "Option::is_none"
    )]
    pub allowed_recipients: Option<BTreeSet<String>>,

    /// Region or country codes the action may run in.
    #[serde(default, alias = "geoFence", skip_serializing_if = "Option::is_none")]
    pub geo_fence: Option<Vec<String>>,

    #[serde(
        default,
        alias = "validHours",
        skip_serializing_if = "Option::is_none"
    )]
    pub valid_hours: Option<ValidHours>,

    #[serde(
        default,
        alias = "requireConfirmationAbove",
        skip_serializing_if = "Option::is_none"
    )]
    pub require_confirmation_above: Option<f64>,

    /// The proof may be redeemed by exactly one verification.
    #[serde(default, alias = "singleUse")]
    pub single_use: bool,
}

impl Constraints {
    /// Constraints with only the single-use flag set.
    pub fn single_use() -> Self {
        Self {
            single_use: true,
            ..Self::default()
        }
    }

    pub fn with_max_amount(mut self, max: f64) -> Self {
        self.max_amount = Some(max);
        self
    }

    pub fn with_allowed_recipients<I, S>(mut self, recipients: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_recipients = Some(recipients.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_geo_fence<I, S>(mut self, regions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.geo_fence = Some(regions.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_valid_hours(mut self, start: u8, end: u8) -> Self {
        self.valid_hours = Some(ValidHours { start, end });
        self
    }

    pub fn with_confirmation_above(mut self, threshold: f64) -> Self {
        self.require_confirmation_above = Some(threshold);
        self
    }

    /// Reject bounds that can never be evaluated meaningfully.
    pub fn validate(&self) -> Result<()> {
        check_amount("max_amount", self.max_amount)?;
        check_amount(
            "require_confirmation_above",
            self.require_confirmation_above,
        )?;

        if let Some(hours) = &self.valid_hours {
            if hours.start > 23 || hours.end > 23 {
                return Err(ProofError::InvalidConstraints(format!(
                    "valid_hours must be within 0..=23, got {}..{}",
                    hours.start, hours.end
                )));
            }
            if hours.start == hours.end {
                return Err(ProofError::InvalidConstraints(
                    "valid_hours window is empty".into(),
                ));
            }
        }

        if let Some(fence) = &self.geo_fence {
            if fence.is_empty() || fence.iter().any(|r| r.trim().is_empty()) {
                return Err(ProofError::InvalidConstraints(
                    "geo_fence must list at least one non-empty region".into(),
                ));
            }
        }

        Ok(())
    }
}

fn check_amount(field: &str, amount: Option<f64>) -> Result<()> {
    match amount {
        Some(value) if !value.is_finite() || value < 0.0 => Err(
            ProofError::InvalidConstraints(format!("{field} must be a finite, non-negative number")),
        ),
        _ => Ok(()),
    }
}

/// The signed content of a Liability Proof.
///
/// Immutable once issued; the signature covers its exact serialized bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProofPayload {
    pub proof_id: ProofId,
    pub principal: Principal,
    pub agent: Agent,
    pub intent: Intent,
    #[serde(default)]
    pub constraints: Constraints,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl ProofPayload {
    /// Serialize to the bytes that get signed.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| ProofError::SerializationError(e.to_string()))
    }

    /// Parse payload bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| ProofError::SerializationError(e.to_string()))
    }
}

/// An issued, signed Liability Proof.
#[derive(Debug, Clone)]
pub struct LiabilityProof {
    pub payload: ProofPayload,
    /// Key that signed the payload.
    pub kid: KeyId,
    /// URL-safe base64 Ed25519 signature over the payload bytes.
    pub signature: String,
    /// Transport-ready encoding of payload and signature.
    pub header: String,
}

impl LiabilityProof {
    pub fn proof_id(&self) -> &ProofId {
        &self.payload.proof_id
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.payload.expires_at
    }
}
