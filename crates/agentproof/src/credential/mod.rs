//! Credential Store: the principals the service may issue proofs for.
//!
//! A credential ties a credential ID to one principal and, optionally, to
//! the SHA-256 digest of a device attestation. The issuer authenticates
//! every proof request against this store before signing.

pub mod store;

pub use store::{CredentialSeed, MemoryCredentialStore};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{ProofError, Result};
use crate::proof::Principal;

/// A registered principal credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub id: String,
    pub principal_id: String,
    /// Hex SHA-256 of the device attestation bound to this credential.
    pub device_attestation_digest: Option<String>,
    pub created_at: DateTime<Utc>,
    pub revoked: bool,
}

impl Credential {
    pub fn new(id: impl Into<String>, principal_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            principal_id: principal_id.into(),
            device_attestation_digest: None,
            created_at: crate::time::now(),
            revoked: false,
        }
    }

    /// Bind a device attestation. Only its digest is kept.
    pub fn with_device_attestation(mut self, attestation: &str) -> Self {
        self.device_attestation_digest = Some(attestation_digest(attestation));
        self
    }
}

/// Hex SHA-256 of an attestation blob.
pub fn attestation_digest(attestation: &str) -> String {
    hex::encode(Sha256::digest(attestation.as_bytes()))
}

/// Lookup and lifecycle of principal credentials.
pub trait CredentialStore: Send + Sync {
    /// Find a credential by ID.
    fn lookup(&self, credential_id: &str) -> Result<Option<Credential>>;

    /// Add or replace a credential.
    fn insert(&self, credential: Credential) -> Result<()>;

    /// Mark a credential revoked.
    fn revoke(&self, credential_id: &str) -> Result<()>;

    /// Check that `principal` may be issued a proof.
    ///
    /// The credential must exist, be unrevoked, and belong to the
    /// principal. If it carries an attestation digest, the principal
    /// must present the matching attestation.
    fn authenticate(&self, principal: &Principal) -> Result<Credential> {
        let credential = self
            .lookup(&principal.credential_id)?
            .filter(|c| !c.revoked && c.principal_id == principal.id)
            .ok_or_else(|| ProofError::UnknownPrincipal(principal.id.clone()))?;

        if let Some(expected) = &credential.device_attestation_digest {
            let presented = principal
                .device_attestation
                .as_deref()
                .map(attestation_digest);
            if presented.as_ref() != Some(expected) {
                return Err(ProofError::AttestationMismatch(principal.id.clone()));
            }
        }

        Ok(credential)
    }
}
