//! .apk file format: encrypted service key storage.
//!
//! An `.apk` file stores the service's proof-signing key encrypted with
//! ChaCha20-Poly1305 under a key derived from an operator passphrase via
//! Argon2id, alongside the key ID and public key in plaintext so the file
//! can be identified without decrypting it.
//!
//! File format (JSON):
//! ```json
//! {
//!     "version": 1,
//!     "format": "apk-v1",
//!     "kid": "apk_...",
//!     "public_key": "<base64-32-bytes>",
//!     "encryption": {
//!         "algorithm": "chacha20-poly1305",
//!         "kdf": "argon2id",
//!         "salt": "<base64-16-bytes>",
//!         "nonce": "<base64-12-bytes>"
//!     },
//!     "encrypted_key": "<base64-ciphertext>"
//! }
//! ```

use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use super::write_atomic;
use crate::crypto::{derivation, encryption, KeyId, ServiceKey};
use crate::error::{ProofError, Result};

const APK_VERSION: u32 = 1;
const APK_FORMAT: &str = "apk-v1";
const APK_ALGORITHM: &str = "chacha20-poly1305";
const APK_KDF: &str = "argon2id";

/// Top-level structure written to disk as an `.apk` file.
#[derive(Debug, Serialize, Deserialize)]
pub struct KeyFile {
    pub version: u32,
    pub format: String,
    pub kid: KeyId,
    /// Base64 Ed25519 public key.
    pub public_key: String,
    pub encryption: EncryptionMetadata,
    /// Base64 ciphertext of the 32 signing key bytes.
    pub encrypted_key: String,
}

/// Encryption parameters needed to decrypt the key.
#[derive(Debug, Serialize, Deserialize)]
pub struct EncryptionMetadata {
    pub algorithm: String,
    pub kdf: String,
    /// Base64 Argon2id salt (16 bytes).
    pub salt: String,
    /// Base64 ChaCha20-Poly1305 nonce (12 bytes).
    pub nonce: String,
}

/// Save a service key to an `.apk` file, encrypted under `passphrase`.
///
/// The write is atomic (temp file then rename).
pub fn save_service_key(key: &ServiceKey, path: &Path, passphrase: &str) -> Result<()> {
    // passphrase -> Argon2id(salt) -> master key -> HKDF(context) -> encryption key
    let salt = crate::crypto::random::random_salt_16();
    let mut master_key = encryption::derive_passphrase_key(passphrase.as_bytes(), &salt)?;
    let mut encryption_key = derivation::derive_key(&master_key, &derivation::key_file_context())?;
    master_key.zeroize();

    let mut secret = key.signing_key_bytes();
    let sealed = encryption::seal(&encryption_key, &secret);
    secret.zeroize();
    encryption_key.zeroize();
    let sealed = sealed?;

    let file = KeyFile {
        version: APK_VERSION,
        format: APK_FORMAT.to_string(),
        kid: key.kid().clone(),
        public_key: key.public_key_base64(),
        encryption: EncryptionMetadata {
            algorithm: APK_ALGORITHM.to_string(),
            kdf: APK_KDF.to_string(),
            salt: STANDARD.encode(salt),
            nonce: STANDARD.encode(sealed.nonce),
        },
        encrypted_key: STANDARD.encode(&sealed.ciphertext),
    };

    let json = serde_json::to_string_pretty(&file)
        .map_err(|e| ProofError::SerializationError(e.to_string()))?;
    write_atomic(path, json.as_bytes())?;
    log::info!("saved service key {} to {}", file.kid, path.display());
    Ok(())
}

/// Load a service key from an `.apk` file.
///
/// A wrong passphrase fails AEAD authentication and yields
/// [`ProofError::InvalidPassphrase`].
pub fn load_service_key(path: &Path, passphrase: &str) -> Result<ServiceKey> {
    let file = read_key_file(path)?;

    let salt: [u8; 16] = decode_field("salt", &file.encryption.salt)?
        .try_into()
        .map_err(|_| ProofError::InvalidKeyFile("salt must be 16 bytes".into()))?;
    let sealed = encryption::SealedKey::from_parts(
        &decode_field("nonce", &file.encryption.nonce)?,
        decode_field("encrypted_key", &file.encrypted_key)?,
    )?;

    let mut master_key = encryption::derive_passphrase_key(passphrase.as_bytes(), &salt)?;
    let mut encryption_key = derivation::derive_key(&master_key, &derivation::key_file_context())?;
    master_key.zeroize();

    let decrypted = encryption::open(&encryption_key, &sealed);
    encryption_key.zeroize();
    let mut plaintext = decrypted?;

    let key_bytes: std::result::Result<[u8; 32], _> = plaintext.as_slice().try_into();
    plaintext.zeroize();
    let mut key_bytes =
        key_bytes.map_err(|_| ProofError::InvalidKey("signing key must be 32 bytes".into()))?;

    let key = ServiceKey::from_signing_key_bytes(&key_bytes);
    key_bytes.zeroize();

    if key.kid() != &file.kid {
        return Err(ProofError::InvalidKeyFile(format!(
            "key ID mismatch: file says {}, key is {}",
            file.kid,
            key.kid()
        )));
    }
    Ok(key)
}

/// Read the key ID of an `.apk` file without the passphrase.
pub fn read_key_id(path: &Path) -> Result<KeyId> {
    Ok(read_key_file(path)?.kid)
}

/// Load the key at `path`, or generate and save a new one if the file does
/// not exist.
pub fn load_or_generate(path: &Path, passphrase: &str) -> Result<ServiceKey> {
    if path.exists() {
        return load_service_key(path, passphrase);
    }
    let key = ServiceKey::generate();
    save_service_key(&key, path, passphrase)?;
    log::warn!(
        "no key file at {}; generated new service key {}",
        path.display(),
        key.kid()
    );
    Ok(key)
}

fn read_key_file(path: &Path) -> Result<KeyFile> {
    let bytes = std::fs::read(path).map_err(|e| {
        ProofError::KeyUnavailable(format!("cannot read {}: {e}", path.display()))
    })?;
    let file: KeyFile = serde_json::from_slice(&bytes)
        .map_err(|e| ProofError::InvalidKeyFile(format!("failed to parse key file: {e}")))?;

    if file.version != APK_VERSION || file.format != APK_FORMAT {
        return Err(ProofError::InvalidKeyFile(format!(
            "unsupported key file version={} format={}",
            file.version, file.format
        )));
    }
    if file.encryption.algorithm != APK_ALGORITHM || file.encryption.kdf != APK_KDF {
        return Err(ProofError::InvalidKeyFile(format!(
            "unsupported encryption {}/{}",
            file.encryption.algorithm, file.encryption.kdf
        )));
    }
    Ok(file)
}

fn decode_field(name: &str, value: &str) -> Result<Vec<u8>> {
    STANDARD
        .decode(value)
        .map_err(|e| ProofError::InvalidKeyFile(format!("invalid {name} base64: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_file_save_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("service.apk");
        let key = ServiceKey::generate();

        save_service_key(&key, &path, "correct-horse").unwrap();
        let loaded = load_service_key(&path, "correct-horse").unwrap();

        assert_eq!(loaded.kid(), key.kid());
        assert_eq!(loaded.signing_key_bytes(), key.signing_key_bytes());
        assert_eq!(read_key_id(&path).unwrap(), *key.kid());
    }

    #[test]
    fn test_key_file_does_not_contain_secret() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("service.apk");
        let key = ServiceKey::generate();
        save_service_key(&key, &path, "pass").unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(!raw.contains(&STANDARD.encode(key.signing_key_bytes())));

        let file: KeyFile = serde_json::from_str(&raw).unwrap();
        assert_eq!(file.format, APK_FORMAT);
        assert_eq!(STANDARD.decode(&file.encryption.salt).unwrap().len(), 16);
        assert_eq!(STANDARD.decode(&file.encryption.nonce).unwrap().len(), 12);
    }

    #[test]
    fn test_wrong_passphrase() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("service.apk");
        save_service_key(&ServiceKey::generate(), &path, "right").unwrap();
        assert!(matches!(
            load_service_key(&path, "wrong"),
            Err(ProofError::InvalidPassphrase)
        ));
    }

    #[test]
    fn test_missing_file_is_key_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load_service_key(&dir.path().join("absent.apk"), "pass"),
            Err(ProofError::KeyUnavailable(_))
        ));
    }

    #[test]
    fn test_load_or_generate_is_stable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keys").join("service.apk");
        let first = load_or_generate(&path, "pass").unwrap();
        let second = load_or_generate(&path, "pass").unwrap();
        assert_eq!(first.kid(), second.kid());
    }
}
