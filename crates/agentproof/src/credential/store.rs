//! In-memory credential store, optionally seeded from a JSON file.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{PoisonError, RwLock};

use serde::{Deserialize, Serialize};

use super::{Credential, CredentialStore};
use crate::error::{ProofError, Result};

/// One entry of a credentials file.
///
/// ```json
/// [{ "id": "cred-1", "principalId": "user-1", "deviceAttestation": "..." }]
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialSeed {
    pub id: String,
    pub principal_id: String,
    #[serde(default)]
    pub device_attestation: Option<String>,
}

impl From<CredentialSeed> for Credential {
    fn from(seed: CredentialSeed) -> Self {
        let credential = Credential::new(seed.id, seed.principal_id);
        match seed.device_attestation {
            Some(attestation) => credential.with_device_attestation(&attestation),
            None => credential,
        }
    }
}

/// Credentials held in a map behind a read-write lock.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    credentials: RwLock<HashMap<String, Credential>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load credentials from a JSON seed file.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let seeds: Vec<CredentialSeed> = serde_json::from_str(&json).map_err(|e| {
            ProofError::SerializationError(format!("{}: {e}", path.display()))
        })?;

        let store = Self::new();
        for seed in seeds {
            store.insert(seed.into())?;
        }
        log::info!(
            "loaded {} credentials from {}",
            store.len(),
            path.display()
        );
        Ok(store)
    }

    pub fn len(&self) -> usize {
        self.credentials
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn lookup(&self, credential_id: &str) -> Result<Option<Credential>> {
        let credentials = self.credentials.read().unwrap_or_else(PoisonError::into_inner);
        Ok(credentials.get(credential_id).cloned())
    }

    /// A credential ID can be re-issued to the same principal but never
    /// moved to another one. Re-issuing cannot lift a revocation or change
    /// the device binding once one is set.
    fn insert(&self, mut credential: Credential) -> Result<()> {
        if credential.id.trim().is_empty() || credential.principal_id.trim().is_empty() {
            return Err(ProofError::InvalidRequest(
                "credential id and principal id are required".into(),
            ));
        }

        let mut credentials = self.credentials.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = credentials.get(&credential.id) {
            if existing.principal_id != credential.principal_id {
                return Err(ProofError::InvalidRequest(format!(
                    "credential {} belongs to another principal",
                    credential.id
                )));
            }
            if existing.revoked {
                return Err(ProofError::InvalidRequest(format!(
                    "credential {} is revoked",
                    credential.id
                )));
            }
            if existing.device_attestation_digest.is_some()
                && existing.device_attestation_digest != credential.device_attestation_digest
            {
                return Err(ProofError::InvalidRequest(format!(
                    "credential {} is bound to another device attestation",
                    credential.id
                )));
            }
            credential.created_at = existing.created_at;
        }
        log::debug!(
            "registered credential {} for principal {}",
            credential.id,
            credential.principal_id
        );
        credentials.insert(credential.id.clone(), credential);
        Ok(())
    }

    fn revoke(&self, credential_id: &str) -> Result<()> {
        let mut credentials = self.credentials.write().unwrap_or_else(PoisonError::into_inner);
        let credential = credentials
            .get_mut(credential_id)
            .ok_or_else(|| ProofError::UnknownPrincipal(format!("credential {credential_id}")))?;
        credential.revoked = true;
        log::info!("revoked credential {credential_id}");
        Ok(())
    }
}
