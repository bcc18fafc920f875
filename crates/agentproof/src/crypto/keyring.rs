//! Service signing keys and the key ring.
//!
//! The service signs every Liability Proof with its active [`ServiceKey`].
//! The [`KeyRing`] holds that key plus the public halves of retired keys,
//! so proofs issued before a rotation keep verifying until they expire.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use ed25519_dalek::{Signature, SigningKey, VerifyingKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::derivation;
use super::signing;
use crate::error::Result;

/// Identifier of a service key.
///
/// Format: `apk_` + base58 of the first 8 bytes of SHA-256(public_key).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyId(pub String);

impl KeyId {
    /// Compute the key ID of a verifying (public) key.
    pub fn from_verifying_key(key: &VerifyingKey) -> Self {
        let hash = Sha256::digest(key.as_bytes());
        let encoded = bs58::encode(&hash[..8]).into_string();
        Self(format!("apk_{encoded}"))
    }
}

impl std::fmt::Display for KeyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The service's proof-signing key.
///
/// `SigningKey` zeroizes its secret on drop.
pub struct ServiceKey {
    signing_key: SigningKey,
    verifying_key: VerifyingKey,
    kid: KeyId,
    /// When this key was created or loaded.
    pub created_at: DateTime<Utc>,
}

impl ServiceKey {
    /// Generate a fresh random service key.
    pub fn generate() -> Self {
        Self::from_signing_key(SigningKey::generate(&mut rand::thread_rng()))
    }

    /// Reconstruct a service key from raw signing key bytes.
    pub fn from_signing_key_bytes(bytes: &[u8; 32]) -> Self {
        Self::from_signing_key(SigningKey::from_bytes(bytes))
    }

    /// Derive the service key of a key epoch from a root seed.
    pub fn derive(root_seed: &[u8; 32], epoch: u32) -> Result<Self> {
        let signing_key =
            derivation::derive_signing_key(root_seed, &derivation::proof_signing_context(epoch))?;
        Ok(Self::from_signing_key(signing_key))
    }

    fn from_signing_key(signing_key: SigningKey) -> Self {
        let verifying_key = signing_key.verifying_key();
        Self {
            kid: KeyId::from_verifying_key(&verifying_key),
            signing_key,
            verifying_key,
            created_at: crate::time::now(),
        }
    }

    /// Return the key ID.
    pub fn kid(&self) -> &KeyId {
        &self.kid
    }

    /// Sign a message.
    pub fn sign(&self, message: &[u8]) -> Signature {
        signing::sign(&self.signing_key, message)
    }

    /// Return the verifying (public) key.
    pub fn verifying_key(&self) -> &VerifyingKey {
        &self.verifying_key
    }

    /// Return the public key as standard base64.
    pub fn public_key_base64(&self) -> String {
        STANDARD.encode(self.verifying_key.as_bytes())
    }

    /// Return the signing key bytes. Caller must zeroize after use.
    pub(crate) fn signing_key_bytes(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }
}

impl std::fmt::Debug for ServiceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceKey")
            .field("kid", &self.kid)
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}

/// Public description of a key known to the ring.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicKeyInfo {
    pub kid: KeyId,
    pub public_key: String,
    pub active: bool,
}

struct KeyRingInner {
    active: Arc<ServiceKey>,
    retired: HashMap<KeyId, VerifyingKey>,
}

/// Active signing key plus retired verifying keys, addressable by key ID.
pub struct KeyRing {
    inner: RwLock<KeyRingInner>,
}

impl KeyRing {
    /// Create a ring around an active key.
    pub fn new(active: ServiceKey) -> Self {
        Self {
            inner: RwLock::new(KeyRingInner {
                active: Arc::new(active),
                retired: HashMap::new(),
            }),
        }
    }

    /// Return the active signing key.
    pub fn active(&self) -> Arc<ServiceKey> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&inner.active)
    }

    /// Return the key ID of the active key.
    pub fn active_kid(&self) -> KeyId {
        self.active().kid().clone()
    }

    /// Look up the verifying key for a key ID, active or retired.
    pub fn verifying_key(&self, kid: &KeyId) -> Option<VerifyingKey> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        if inner.active.kid() == kid {
            return Some(*inner.active.verifying_key());
        }
        inner.retired.get(kid).copied()
    }

    /// Make `next` the active key. The previous key stays available for
    /// verification. Returns the retired key's ID.
    pub fn rotate(&self, next: ServiceKey) -> KeyId {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let previous = std::mem::replace(&mut inner.active, Arc::new(next));
        let previous_kid = previous.kid().clone();
        inner
            .retired
            .insert(previous_kid.clone(), *previous.verifying_key());
        log::info!(
            "rotated proof signing key: retired={} active={}",
            previous_kid,
            inner.active.kid()
        );
        previous_kid
    }

    /// Drop a retired key. Proofs signed by it stop verifying.
    pub fn forget(&self, kid: &KeyId) -> bool {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        inner.retired.remove(kid).is_some()
    }

    /// List every key the ring can verify with, active first.
    pub fn public_keys(&self) -> Vec<PublicKeyInfo> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        let mut keys = vec![PublicKeyInfo {
            kid: inner.active.kid().clone(),
            public_key: inner.active.public_key_base64(),
            active: true,
        }];
        keys.extend(inner.retired.iter().map(|(kid, vk)| PublicKeyInfo {
            kid: kid.clone(),
            public_key: STANDARD.encode(vk.to_bytes()),
            active: false,
        }));
        keys
    }
}

impl std::fmt::Debug for KeyRing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyRing")
            .field("active", &self.active_kid())
            .finish_non_exhaustive()
    }
}
