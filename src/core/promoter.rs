use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use crate::core::fs_copy::{self, CopyError};

/// Copies completed staging directories into the user-chosen final
/// destination. The destination root is fixed at construction and never
/// changes for the life of the process.
pub struct PromotionEngine {
    destination_root: PathBuf,
}

#[derive(Debug, Error)]
pub enum PromotionError {
    /// The destination already holds a tree of the same name. Duplicate
    /// timestamps are never expected, so this is an error rather than a
    /// merge or overwrite; the pre-existing tree is left untouched.
    #[error("final backup path {} already exists, refusing to overwrite", .final_path.display())]
    DuplicateTarget { final_path: PathBuf },

    #[error("staging path {} has no directory name", .staging_path.display())]
    InvalidStagingPath { staging_path: PathBuf },

    #[error("promoting backup into {} failed: {source}", .final_path.display())]
    Copy {
        final_path: PathBuf,
        #[source]
        source: CopyError,
    },
}

impl PromotionEngine {
    pub fn new(destination_root: PathBuf) -> Self {
        Self { destination_root }
    }

    /// Copy the staging tree into `<destination_root>/<basename>` and return
    /// the final path. On partial failure the partial destination tree is
    /// left as-is.
    pub fn promote(&self, staging_path: &Path) -> Result<PathBuf, PromotionError> {
        let name = staging_path
            .file_name()
            .ok_or_else(|| PromotionError::InvalidStagingPath {
                staging_path: staging_path.to_path_buf(),
            })?;
        let final_path = self.destination_root.join(name);

        if final_path.exists() {
            return Err(PromotionError::DuplicateTarget { final_path });
        }

        info!(
            staging = %staging_path.display(),
            destination = %final_path.display(),
            "promoting backup"
        );

        fs_copy::copy_tree(staging_path, &final_path).map_err(|source| PromotionError::Copy {
            final_path: final_path.clone(),
            source,
        })?;

        info!(destination = %final_path.display(), "backup promoted");
        Ok(final_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use filetime::FileTime;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn promote_copies_staging_tree_under_destination_root() {
        let temp = tempdir().unwrap();
        let staging = temp.path().join("USB_Backup_2024-01-01_12-00-00");
        let destination = temp.path().join("backups");

        fs::create_dir(&staging).unwrap();
        fs::write(staging.join("notes.txt"), b"hi").unwrap();
        fs::create_dir(staging.join("sub")).unwrap();
        fs::write(staging.join("sub/b.txt"), b"nested").unwrap();
        let mtime = FileTime::from_unix_time(1_500_000_000, 0);
        filetime::set_file_mtime(staging.join("notes.txt"), mtime).unwrap();
        fs::create_dir(&destination).unwrap();

        let engine = PromotionEngine::new(destination.clone());
        let final_path = engine.promote(&staging).unwrap();

        assert_eq!(
            final_path,
            destination.join("USB_Backup_2024-01-01_12-00-00")
        );
        assert_eq!(fs::read(final_path.join("notes.txt")).unwrap(), b"hi");
        assert_eq!(fs::read(final_path.join("sub/b.txt")).unwrap(), b"nested");

        let metadata = fs::metadata(final_path.join("notes.txt")).unwrap();
        assert_eq!(FileTime::from_last_modification_time(&metadata), mtime);
    }

    #[test]
    fn promote_refuses_duplicate_target_and_leaves_it_untouched() {
        let temp = tempdir().unwrap();
        let staging = temp.path().join("USB_Backup_2024-01-01_12-00-00");
        let destination = temp.path().join("backups");
        let existing = destination.join("USB_Backup_2024-01-01_12-00-00");

        fs::create_dir(&staging).unwrap();
        fs::write(staging.join("new.txt"), b"new").unwrap();
        fs::create_dir_all(&existing).unwrap();
        fs::write(existing.join("precious.txt"), b"keep me").unwrap();

        let engine = PromotionEngine::new(destination);
        let err = engine.promote(&staging).unwrap_err();

        assert!(matches!(err, PromotionError::DuplicateTarget { .. }));
        assert_eq!(fs::read(existing.join("precious.txt")).unwrap(), b"keep me");
        assert!(!existing.join("new.txt").exists());
    }

    #[test]
    fn promote_rejects_staging_path_without_a_name() {
        let engine = PromotionEngine::new(PathBuf::from("/backups"));
        let err = engine.promote(Path::new("/")).unwrap_err();
        assert!(matches!(err, PromotionError::InvalidStagingPath { .. }));
    }
}
