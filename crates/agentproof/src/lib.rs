//! AgentProof: Liability Proofs for AI agents.
//!
//! Issues signed proofs binding a principal, an agent, and an intent;
//! verifies them with cumulative diagnostics; and resolves, registers
//! and revokes trust between agents and the principals behind them.

pub mod credential;
pub mod crypto;
pub mod error;
pub mod proof;
pub mod registry;
pub mod storage;
pub mod time;

// Re-export primary types
pub use credential::{Credential, CredentialStore, MemoryCredentialStore};
pub use crypto::{KeyId, KeyRing, ServiceKey};
pub use error::{ProofError, Result};
pub use proof::{
    Agent, ConstraintPolicy, Constraints, EmbeddedConstraintPolicy, ExecutionContext, Intent,
    IssuerConfig, LiabilityProof, Principal, ProofId, ProofIssuer, ProofRequest, ProofVerifier,
    RedemptionLedger, VerifyError, VerifyResult,
};
pub use registry::{RegistryConfig, TrustRegistry, TrustResolution};
