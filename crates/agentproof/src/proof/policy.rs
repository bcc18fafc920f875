//! Constraint evaluation at verification time.
//!
//! How a proof's constraints are compared against a live transaction is
//! policy, so it sits behind the [`ConstraintPolicy`] trait. The default
//! [`EmbeddedConstraintPolicy`] reads each value from the caller's
//! [`ExecutionContext`] first and falls back to the intent's parameters.
//! A constraint whose value is supplied by neither is not evaluated.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::types::ProofPayload;
use super::verifier::VerifyError;

/// Live values of the transaction a proof is presented for.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionContext {
    pub amount: Option<f64>,
    pub recipient: Option<String>,
    /// Region or country code the action executes in.
    pub region: Option<String>,
    /// Whether the principal confirmed this action out of band.
    pub confirmed: Option<bool>,
    /// Instant the action executes at; defaults to verification time.
    pub at: Option<DateTime<Utc>>,
}

impl ExecutionContext {
    pub fn with_amount(mut self, amount: f64) -> Self {
        self.amount = Some(amount);
        self
    }

    pub fn with_recipient(mut self, recipient: impl Into<String>) -> Self {
        self.recipient = Some(recipient.into());
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn with_confirmation(mut self, confirmed: bool) -> Self {
        self.confirmed = Some(confirmed);
        self
    }

    pub fn at(mut self, at: DateTime<Utc>) -> Self {
        self.at = Some(at);
        self
    }
}

/// Evaluates a proof's constraints. Returns every violation found.
pub trait ConstraintPolicy: Send + Sync {
    fn evaluate(
        &self,
        payload: &ProofPayload,
        context: &ExecutionContext,
        now: DateTime<Utc>,
    ) -> Vec<VerifyError>;
}

/// Default policy: context values, then intent parameters
/// (`amount`, `recipient`, `region`, `confirmed`).
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddedConstraintPolicy;

impl EmbeddedConstraintPolicy {
    fn amount(payload: &ProofPayload, context: &ExecutionContext) -> Option<f64> {
        context.amount.or_else(|| {
            payload
                .intent
                .parameter("amount")
                .and_then(serde_json::Value::as_f64)
        })
    }

    fn text(
        payload: &ProofPayload,
        from_context: &Option<String>,
        parameter: &str,
    ) -> Option<String> {
        from_context.clone().or_else(|| {
            payload
                .intent
                .parameter(parameter)
                .and_then(serde_json::Value::as_str)
                .map(str::to_string)
        })
    }

    fn confirmed(payload: &ProofPayload, context: &ExecutionContext) -> bool {
        context
            .confirmed
            .or_else(|| {
                payload
                    .intent
                    .parameter("confirmed")
                    .and_then(serde_json::Value::as_bool)
            })
            .unwrap_or(false)
    }
}

impl ConstraintPolicy for EmbeddedConstraintPolicy {
    fn evaluate(
        &self,
        payload: &ProofPayload,
        context: &ExecutionContext,
        now: DateTime<Utc>,
    ) -> Vec<VerifyError> {
        let constraints = &payload.constraints;
        let mut errors = Vec::new();
        let amount = Self::amount(payload, context);

        if let (Some(max), Some(amount)) = (constraints.max_amount, amount) {
            if amount > max {
                errors.push(VerifyError::AmountExceedsMax);
            }
        }

        if let Some(allowed) = &constraints.allowed_recipients {
            if let Some(recipient) = Self::text(payload, &context.recipient, "recipient") {
                if !allowed.contains(&recipient) {
                    errors.push(VerifyError::RecipientNotAllowed);
                }
            }
        }

        if let Some(fence) = &constraints.geo_fence {
            if let Some(region) = Self::text(payload, &context.region, "region") {
                if !fence.iter().any(|r| r.eq_ignore_ascii_case(&region)) {
                    errors.push(VerifyError::GeoFenceViolation);
                }
            }
        }

        if let Some(hours) = &constraints.valid_hours {
            if !hours.contains(context.at.unwrap_or(now)) {
                errors.push(VerifyError::OutsideValidHours);
            }
        }

        if let (Some(threshold), Some(amount)) = (constraints.require_confirmation_above, amount) {
            if amount > threshold && !Self::confirmed(payload, context) {
                errors.push(VerifyError::ConfirmationRequired);
            }
        }

        errors
    }
}
