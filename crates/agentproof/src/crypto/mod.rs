//! Cryptographic primitives for AgentProof.
//!
//! This module provides:
//! - Ed25519 key generation, signing, and verification
//! - The service key ring used to sign and check Liability Proofs
//! - HKDF-SHA256 key derivation
//! - Argon2id passphrase-based key derivation
//! - ChaCha20-Poly1305 authenticated encryption
//! - Cryptographically secure random number generation

pub mod derivation;
pub mod encryption;
pub mod keyring;
pub mod random;
pub mod signing;

pub use keyring::{KeyId, KeyRing, ServiceKey};
