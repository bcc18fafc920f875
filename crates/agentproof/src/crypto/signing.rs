//! Ed25519 signing and verification.
//!
//! Signatures travel inside proof headers, so the encoded forms use
//! URL-safe base64 without padding.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};

use crate::error::{ProofError, Result};

/// Sign a message with an Ed25519 signing key.
pub fn sign(signing_key: &SigningKey, message: &[u8]) -> Signature {
    signing_key.sign(message)
}

/// Verify an Ed25519 signature against a public key and message.
pub fn verify(verifying_key: &VerifyingKey, message: &[u8], signature: &Signature) -> Result<()> {
    verifying_key
        .verify(message, signature)
        .map_err(|_| ProofError::SignatureInvalid)
}

/// Encode a signature as URL-safe base64.
pub fn encode_signature(signature: &Signature) -> String {
    URL_SAFE_NO_PAD.encode(signature.to_bytes())
}

/// Decode a URL-safe base64 signature.
pub fn decode_signature(encoded: &str) -> Result<Signature> {
    let sig_bytes = URL_SAFE_NO_PAD
        .decode(encoded)
        .map_err(|e| ProofError::InvalidKey(format!("invalid base64 signature: {e}")))?;

    let sig_array: [u8; 64] = sig_bytes
        .try_into()
        .map_err(|_| ProofError::InvalidKey("signature must be 64 bytes".into()))?;

    Ok(Signature::from_bytes(&sig_array))
}
