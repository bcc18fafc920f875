//! Trust Registry: the "DNS" of agent/principal trust.
//!
//! Resolves an (agent, principal) pair to whether the principal currently
//! stands behind the agent, how much trust has accumulated, and how long
//! a caller may cache the answer.

pub mod engine;
pub mod record;

pub use engine::TrustRegistry;
pub use record::{
    RegistryConfig, RevocationEntry, TrustEvent, TrustEventKind, TrustKey, TrustRecord,
    TrustResolution,
};
