//! Liability Proofs: issuance and verification.
//!
//! A Liability Proof is a signed statement that a principal accepts
//! liability for one intent carried out by one agent, within optional
//! constraints and a bounded lifetime.

pub mod header;
pub mod issuer;
pub mod ledger;
pub mod policy;
pub mod types;
pub mod verifier;

pub use header::{decode_header, encode_header, HeaderError, HEADER_NAME};
pub use issuer::{
    IssuerConfig, ProofIssuer, ProofRequest, DEFAULT_EXPIRES_IN_SECS, MAX_TTL_CEILING_SECS,
};
pub use ledger::{Redemption, RedemptionLedger};
pub use policy::{ConstraintPolicy, EmbeddedConstraintPolicy, ExecutionContext};
pub use types::{
    Agent, Constraints, Intent, IntentTarget, LiabilityProof, Principal, ProofId, ProofPayload,
    ValidHours,
};
pub use verifier::{ProofVerifier, VerifyError, VerifyResult};
