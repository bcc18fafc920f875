//! Symmetric encryption using ChaCha20-Poly1305 and passphrase-based
//! key derivation using Argon2id.
//!
//! Used for encrypting the service signing key at rest in `.apk` key files.

use argon2::{Algorithm, Argon2, Params, Version};
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Key, Nonce,
};

use crate::crypto::random::random_bytes;
use crate::error::{ProofError, Result};

// Argon2id cost: 64 MiB, 3 passes, 4 lanes.
const ARGON2_M_COST: u32 = 64 * 1024;
const ARGON2_T_COST: u32 = 3;
const ARGON2_P_COST: u32 = 4;

/// ChaCha20-Poly1305 nonce length in bytes.
pub const NONCE_LEN: usize = 12;

/// Stretch an operator passphrase into a 32-byte master key.
pub fn derive_passphrase_key(passphrase: &[u8], salt: &[u8; 16]) -> Result<[u8; 32]> {
    let params = Params::new(ARGON2_M_COST, ARGON2_T_COST, ARGON2_P_COST, Some(32))
        .map_err(|e| ProofError::DerivationFailed(format!("argon2id params: {e}")))?;

    let mut master = [0u8; 32];
    Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
        .hash_password_into(passphrase, salt, &mut master)
        .map_err(|e| ProofError::DerivationFailed(format!("argon2id: {e}")))?;
    Ok(master)
}

/// Secret bytes sealed with ChaCha20-Poly1305.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedKey {
    pub nonce: [u8; NONCE_LEN],
    pub ciphertext: Vec<u8>,
}

impl SealedKey {
    /// Rebuild from stored parts; the nonce must be exactly `NONCE_LEN` bytes.
    pub fn from_parts(nonce: &[u8], ciphertext: Vec<u8>) -> Result<Self> {
        let nonce = nonce.try_into().map_err(|_| {
            ProofError::DecryptionFailed(format!("nonce must be {NONCE_LEN} bytes"))
        })?;
        Ok(Self { nonce, ciphertext })
    }
}

fn cipher(key: &[u8; 32]) -> ChaCha20Poly1305 {
    ChaCha20Poly1305::new(Key::from_slice(key))
}

/// Seal `secret` under `key` with a fresh random nonce.
pub fn seal(key: &[u8; 32], secret: &[u8]) -> Result<SealedKey> {
    let nonce: [u8; NONCE_LEN] = random_bytes();
    let ciphertext = cipher(key)
        .encrypt(Nonce::from_slice(&nonce), secret)
        .map_err(|e| ProofError::EncryptionFailed(format!("seal: {e}")))?;
    Ok(SealedKey { nonce, ciphertext })
}

/// Open a sealed secret.
///
/// Authentication failure means the key came from the wrong passphrase or
/// the ciphertext was altered; both surface as `InvalidPassphrase`.
pub fn open(key: &[u8; 32], sealed: &SealedKey) -> Result<Vec<u8>> {
    cipher(key)
        .decrypt(Nonce::from_slice(&sealed.nonce), sealed.ciphertext.as_slice())
        .map_err(|_| ProofError::InvalidPassphrase)
}
