//! Storage layer for the service key and trust records.
//!
//! # Directory layout
//!
//! ```text
//! {data_dir}/
//! ├── service.apk
//! └── trust/
//!     └── {pair_digest}.json
//! ```
//!
//! # Modules
//!
//! - [`key_file`]: `.apk` save/load with passphrase encryption.
//! - [`record_store`]: persistence for `TrustRecord`s.

pub mod key_file;
pub mod record_store;

use std::path::Path;

use crate::error::Result;

pub use key_file::{
    load_or_generate, load_service_key, read_key_id, save_service_key, EncryptionMetadata, KeyFile,
};
pub use record_store::{FileRecordStore, TrustRecordStore};

/// Write `data` to `path` through a sibling temp file and rename, so a
/// reader never sees a partial file. Creates the parent directory.
pub(crate) fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = std::path::PathBuf::from(tmp_name);

    std::fs::write(&tmp_path, data)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}
