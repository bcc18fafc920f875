//! Proof header encoding.
//!
//! A header is URL-safe unpadded base64 of a JSON envelope:
//!
//! ```json
//! { "v": 1, "alg": "Ed25519", "kid": "apk_...", "payload": "<b64url>", "sig": "<b64url>" }
//! ```
//!
//! `payload` carries the exact bytes that were signed. Envelope fields
//! are looked up by name, so their order never matters. Truncation or
//! corruption surfaces as a [`HeaderError`], never a panic.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use ed25519_dalek::Signature;
use serde::{Deserialize, Serialize};

use crate::crypto::{signing, KeyId};

use super::types::ProofPayload;

/// HTTP header that carries a proof between agent and relying service.
pub const HEADER_NAME: &str = "X-AgentProof";

/// Current envelope version.
pub const HEADER_VERSION: u32 = 1;

/// Signature scheme named in the envelope.
pub const SIGNATURE_ALGORITHM: &str = "Ed25519";

/// Headers longer than this are rejected before decoding.
pub const MAX_HEADER_LEN: usize = 16 * 1024;

/// Why a header could not be decoded.
#[derive(Debug, thiserror::Error)]
pub enum HeaderError {
    #[error("header is empty")]
    Empty,

    #[error("header exceeds {MAX_HEADER_LEN} bytes")]
    TooLong,

    #[error("invalid base64: {0}")]
    Encoding(String),

    #[error("invalid envelope: {0}")]
    Envelope(String),

    #[error("unsupported envelope version {0}")]
    UnsupportedVersion(u32),

    #[error("unsupported signature algorithm {0}")]
    UnsupportedAlgorithm(String),

    #[error("invalid signature encoding")]
    Signature,

    #[error("invalid payload: {0}")]
    Payload(String),
}

/// The named fields of an encoded header.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProofEnvelope {
    pub v: u32,
    pub alg: String,
    pub kid: KeyId,
    pub payload: String,
    pub sig: String,
}

impl ProofEnvelope {
    /// Build an envelope from payload bytes and their signature.
    pub fn new(kid: KeyId, payload_bytes: &[u8], signature: &Signature) -> Self {
        Self {
            v: HEADER_VERSION,
            alg: SIGNATURE_ALGORITHM.to_string(),
            kid,
            payload: URL_SAFE_NO_PAD.encode(payload_bytes),
            sig: signing::encode_signature(signature),
        }
    }

    /// Parse the envelope out of a header string without checking it.
    pub fn parse(header: &str) -> Result<Self, HeaderError> {
        let header = header.trim();
        if header.is_empty() {
            return Err(HeaderError::Empty);
        }
        if header.len() > MAX_HEADER_LEN {
            return Err(HeaderError::TooLong);
        }
        let json = URL_SAFE_NO_PAD
            .decode(header)
            .map_err(|e| HeaderError::Encoding(e.to_string()))?;
        serde_json::from_slice(&json).map_err(|e| HeaderError::Envelope(e.to_string()))
    }

    /// Encode the envelope as a header string.
    pub fn encode(&self) -> String {
        // A struct of strings and an integer always serializes.
        let json = serde_json::to_vec(self).unwrap_or_default();
        URL_SAFE_NO_PAD.encode(json)
    }

    /// Decode the embedded payload bytes.
    pub fn payload_bytes(&self) -> Result<Vec<u8>, HeaderError> {
        URL_SAFE_NO_PAD
            .decode(&self.payload)
            .map_err(|e| HeaderError::Encoding(e.to_string()))
    }

    /// Replace the embedded payload bytes, keeping the signature.
    pub fn with_payload_bytes(mut self, payload_bytes: &[u8]) -> Self {
        self.payload = URL_SAFE_NO_PAD.encode(payload_bytes);
        self
    }
}

/// A structurally valid header whose signature has not been checked yet.
#[derive(Debug, Clone)]
pub struct DecodedHeader {
    pub kid: KeyId,
    pub payload_bytes: Vec<u8>,
    pub signature: Signature,
}

impl DecodedHeader {
    /// Parse the signed payload.
    pub fn payload(&self) -> Result<ProofPayload, HeaderError> {
        serde_json::from_slice(&self.payload_bytes).map_err(|e| HeaderError::Payload(e.to_string()))
    }
}

/// Encode signed payload bytes into a header.
pub fn encode_header(kid: &KeyId, payload_bytes: &[u8], signature: &Signature) -> String {
    ProofEnvelope::new(kid.clone(), payload_bytes, signature).encode()
}

/// Decode a header into its key ID, payload bytes and signature.
pub fn decode_header(header: &str) -> Result<DecodedHeader, HeaderError> {
    let envelope = ProofEnvelope::parse(header)?;

    if envelope.v != HEADER_VERSION {
        return Err(HeaderError::UnsupportedVersion(envelope.v));
    }
    if envelope.alg != SIGNATURE_ALGORITHM {
        return Err(HeaderError::UnsupportedAlgorithm(envelope.alg));
    }

    let payload_bytes = envelope.payload_bytes()?;
    let signature = signing::decode_signature(&envelope.sig).map_err(|_| HeaderError::Signature)?;

    Ok(DecodedHeader {
        kid: envelope.kid,
        payload_bytes,
        signature,
    })
}
