// Snapshot persistence: the whole ledger as one pretty JSON document.
// Writes go to a sibling temp file and are renamed into place.

use crate::error::StorageError;
use crate::state::Ledger;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const SNAPSHOT_FILE: &str = "ledger.json";

pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Result<Self, StorageError> {
        fs::create_dir_all(&data_dir)?;
        Ok(Self {
            path: data_dir.as_ref().join(SNAPSHOT_FILE),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Option<Ledger>, StorageError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let data = fs::read(&self.path)?;
        let ledger = serde_json::from_slice::<Ledger>(&data)?;
        debug!(path = %self.path.display(), blocks = ledger.blocks.len(), "loaded snapshot");
        Ok(Some(ledger))
    }

    pub fn save(&self, ledger: &Ledger) -> Result<(), StorageError> {
        let data = serde_json::to_vec_pretty(ledger)?;
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, data)?;
        fs::rename(&tmp_path, &self.path)?;
        debug!(path = %self.path.display(), blocks = ledger.blocks.len(), "saved snapshot");
        Ok(())
    }
}
