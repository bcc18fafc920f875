//! Key derivation using HKDF-SHA256.
//!
//! Derives the proof-signing key from a root seed per key epoch, so a
//! rotation only needs a new epoch number, and derives the key-file
//! encryption key from the Argon2id master key.

use ed25519_dalek::SigningKey;
use hkdf::Hkdf;
use sha2::Sha256;

use crate::error::{ProofError, Result};

/// Derive a 32-byte child key from a root key and context string.
///
/// Uses HKDF-SHA256 (RFC 5869) with the root key as IKM and
/// the context as info.
pub fn derive_key(root_key_bytes: &[u8; 32], context: &str) -> Result<[u8; 32]> {
    let hk = Hkdf::<Sha256>::new(None, root_key_bytes);
    let mut output = [0u8; 32];
    hk.expand(context.as_bytes(), &mut output)
        .map_err(|e| ProofError::DerivationFailed(format!("HKDF expand failed: {e}")))?;
    Ok(output)
}

/// Derive an Ed25519 signing key from a root key and context.
pub fn derive_signing_key(root_key_bytes: &[u8; 32], context: &str) -> Result<SigningKey> {
    let derived = derive_key(root_key_bytes, context)?;
    Ok(SigningKey::from_bytes(&derived))
}

/// Derivation path for the proof-signing key of a key epoch.
pub fn proof_signing_context(epoch: u32) -> String {
    format!("agentproof/proof-signing/{epoch}")
}

/// Derivation path for the key-file encryption key.
pub fn key_file_context() -> String {
    "agentproof/key-file-encryption".to_string()
}
