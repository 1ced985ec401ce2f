//! Status recorder: the single persisted `last-sync.json` record.
//!
//! Each save overwrites the previous record, so after a multi-repository run
//! only the last-processed repository's outcome survives. Writes use the
//! atomic `.tmp` + rename pattern.

use std::path::{Path, PathBuf};

use autosync_core::SyncOutcome;

use crate::error::{io_err, SyncError};

/// Owns the location of the status record.
#[derive(Debug, Clone)]
pub struct StatusRecorder {
    path: PathBuf,
}

impl StatusRecorder {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Overwrite the record with `outcome`.
    ///
    /// Writes to `<path>.tmp` then renames to `<path>`.
    pub fn save(&self, outcome: &SyncOutcome) -> Result<(), SyncError> {
        let Some(dir) = self.path.parent() else {
            return Err(io_err(
                &self.path,
                std::io::Error::other("invalid status record path"),
            ));
        };
        std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;

        let json = serde_json::to_string_pretty(outcome)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, &json).map_err(|e| io_err(&tmp, e))?;
        if let Err(e) = std::fs::rename(&tmp, &self.path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(io_err(&self.path, e));
        }
        Ok(())
    }

    /// The last recorded outcome, or `None` if nothing has been synced yet.
    pub fn load(&self) -> Result<Option<SyncOutcome>, SyncError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&self.path).map_err(|e| io_err(&self.path, e))?;
        Ok(Some(serde_json::from_str(&contents)?))
    }
}
