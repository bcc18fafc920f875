//! Trust record persistence.
//!
//! Each record lives in its own JSON file named by the digest of its
//! (agent, principal) pair:
//!
//! ```text
//! {base_dir}/
//! └── {hex(sha256(agent_id \0 principal_id))}.json
//! ```
//!
//! File format:
//! ```json
//! { "version": 1, "record": { ... TrustRecord ... } }
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::write_atomic;
use crate::error::{ProofError, Result};
use crate::registry::{TrustKey, TrustRecord};

const RECORD_FILE_VERSION: u32 = 1;

/// Wrapper written to disk for each record.
#[derive(Debug, Serialize, Deserialize)]
struct TrustRecordFile {
    version: u32,
    record: TrustRecord,
}

/// Durable backing for the trust registry.
pub trait TrustRecordStore: Send + Sync {
    /// Load every stored record.
    fn load_all(&self) -> Result<Vec<TrustRecord>>;

    /// Write one record, replacing any previous version.
    fn persist(&self, record: &TrustRecord) -> Result<()>;
}

/// Filesystem-backed record store.
#[derive(Debug)]
pub struct FileRecordStore {
    base_dir: PathBuf,
}

impl FileRecordStore {
    /// Create a store rooted at `base_dir`, creating the directory if needed.
    pub fn new(base_dir: impl Into<PathBuf>) -> Result<Self> {
        let base_dir = base_dir.into();
        std::fs::create_dir_all(&base_dir)?;
        Ok(Self { base_dir })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn record_path(&self, key: &TrustKey) -> PathBuf {
        self.base_dir.join(format!("{}.json", key.digest()))
    }

    fn read_record(path: &Path) -> Result<TrustRecord> {
        let bytes = std::fs::read(path)?;
        let file: TrustRecordFile = serde_json::from_slice(&bytes).map_err(|e| {
            ProofError::StorageError(format!("failed to parse {}: {e}", path.display()))
        })?;
        if file.version != RECORD_FILE_VERSION {
            return Err(ProofError::StorageError(format!(
                "unsupported trust record version {} in {}",
                file.version,
                path.display()
            )));
        }
        Ok(file.record)
    }
}

impl TrustRecordStore for FileRecordStore {
    fn load_all(&self) -> Result<Vec<TrustRecord>> {
        let mut records = Vec::new();
        for entry in std::fs::read_dir(&self.base_dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            records.push(Self::read_record(&path)?);
        }
        Ok(records)
    }

    fn persist(&self, record: &TrustRecord) -> Result<()> {
        let file = TrustRecordFile {
            version: RECORD_FILE_VERSION,
            record: record.clone(),
        };
        let json = serde_json::to_string_pretty(&file)
            .map_err(|e| ProofError::SerializationError(e.to_string()))?;
        write_atomic(&self.record_path(&record.key()), json.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::RegistryConfig;

    fn record(agent: &str, principal: &str) -> TrustRecord {
        TrustRecord::new(
            &TrustKey::new(agent, principal),
            Some("Payer".into()),
            Some("1.0.0".into()),
            &RegistryConfig::default(),
            crate::time::now(),
        )
    }

    #[test]
    fn test_persist_and_load_all() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileRecordStore::new(dir.path().join("trust")).unwrap();

        let a = record("agent-1", "user-1");
        let b = record("agent-2", "user-1");
        store.persist(&a).unwrap();
        store.persist(&b).unwrap();

        let mut loaded = store.load_all().unwrap();
        loaded.sort_by(|x, y| x.agent_id.cmp(&y.agent_id));
        assert_eq!(loaded, vec![a, b]);
    }

    #[test]
    fn test_persist_replaces_previous_version() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileRecordStore::new(dir.path()).unwrap();

        let mut r = record("agent-1", "user-1");
        store.persist(&r).unwrap();
        r.trust_score = 7;
        store.persist(&r).unwrap();

        let loaded = store.load_all().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].trust_score, 7);
    }

    #[test]
    fn test_unknown_version_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileRecordStore::new(dir.path()).unwrap();
        let r = record("agent-1", "user-1");
        let json = serde_json::json!({ "version": 9, "record": r });
        std::fs::write(dir.path().join("x.json"), json.to_string()).unwrap();

        assert!(matches!(
            store.load_all(),
            Err(ProofError::StorageError(_))
        ));
    }

    #[test]
    fn test_non_json_files_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileRecordStore::new(dir.path()).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "hello").unwrap();
        assert!(store.load_all().unwrap().is_empty());
    }
}
