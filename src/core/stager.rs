use std::path::{Path, PathBuf};

use chrono::Local;
use thiserror::Error;
use tracing::info;

use crate::core::fs_copy::{self, CopyError};

/// Copies a mounted filesystem tree into a timestamped directory under the
/// staging root. The staging directory is the authoritative record that a
/// backup attempt happened.
pub struct StagingEngine {
    root: PathBuf,
}

/// A staging copy aborted partway. The partial tree at `staging_path` is left
/// in place for inspection; there is no rollback.
#[derive(Debug, Error)]
#[error("staging backup into {} failed: {source}", .staging_path.display())]
pub struct StagingError {
    pub staging_path: PathBuf,
    #[source]
    pub source: CopyError,
}

impl StagingEngine {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Copy the tree under `source_mount` into a fresh staging directory,
    /// creating the staging root if absent, and return the staging path.
    pub fn stage(&self, source_mount: &Path) -> Result<PathBuf, StagingError> {
        let timestamp = Local::now().format("%Y-%m-%d_%H-%M-%S").to_string();
        let staging_path = self.unused_staging_path(&timestamp);

        info!(
            source = %source_mount.display(),
            staging = %staging_path.display(),
            "staging backup"
        );

        fs_copy::copy_tree(source_mount, &staging_path).map_err(|source| StagingError {
            staging_path: staging_path.clone(),
            source,
        })?;

        info!(staging = %staging_path.display(), "staging complete");
        Ok(staging_path)
    }

    /// First unused `USB_Backup_<timestamp>` path under the root.
    ///
    /// Timestamps have second resolution, so back-to-back runs can land on
    /// the same name; a numeric suffix keeps every run's staging tree
    /// separate.
    fn unused_staging_path(&self, timestamp: &str) -> PathBuf {
        let base = self.root.join(format!("USB_Backup_{timestamp}"));
        if !base.exists() {
            return base;
        }

        let mut n = 2;
        loop {
            let candidate = self.root.join(format!("USB_Backup_{timestamp}-{n}"));
            if !candidate.exists() {
                return candidate;
            }
            n += 1;
        }
    }
}
