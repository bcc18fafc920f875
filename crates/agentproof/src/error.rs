//! Error types for AgentProof.
//!
//! All errors are strongly typed and propagated without panicking.
//! Private key material is never included in error messages.
//!
//! Verification failures are not errors: a proof that fails to verify
//! yields a [`VerifyResult`](crate::proof::VerifyResult) with
//! `valid == false`, never an `Err`.

/// Error types covering issuance, registry, credential and key operations.
#[derive(Debug, thiserror::Error)]
pub enum ProofError {
    #[error("Unknown principal: {0}")]
    UnknownPrincipal(String),

    #[error("Invalid expiry: {0}")]
    InvalidExpiry(String),

    #[error("Invalid constraints: {0}")]
    InvalidConstraints(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Unknown trust record: agent={agent_id} principal={principal_id}")]
    UnknownTrustRecord {
        agent_id: String,
        principal_id: String,
    },

    #[error("Device attestation does not match credential: {0}")]
    AttestationMismatch(String),

    #[error("Signing key unavailable: {0}")]
    KeyUnavailable(String),

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Signature verification failed")]
    SignatureInvalid,

    #[error("Key derivation failed: {0}")]
    DerivationFailed(String),

    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),

    #[error("Invalid passphrase")]
    InvalidPassphrase,

    #[error("Invalid key file: {0}")]
    InvalidKeyFile(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProofError {
    /// True for errors caused by the caller's input.
    ///
    /// Everything else is a server fault: safe for the caller to retry,
    /// and reported without internal detail.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownPrincipal(_)
                | Self::InvalidExpiry(_)
                | Self::InvalidConstraints(_)
                | Self::InvalidRequest(_)
                | Self::UnknownTrustRecord { .. }
                | Self::AttestationMismatch(_)
        )
    }
}

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, ProofError>;
