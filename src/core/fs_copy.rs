//! Recursive copy primitives preserving file metadata.
//!
//! Both backup phases go through these: staging walks the source mount with
//! [`copy_tree`], promotion replays the same walk from the staging tree. A
//! failure on any entry aborts the whole copy; whatever was already written
//! stays in place for inspection.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

/// Buffer size for file I/O (128KB for throughput).
const BUFFER_SIZE: usize = 128 * 1024;

#[derive(Debug, Error)]
pub enum CopyError {
    #[error("failed to read directory {}: {source}", .path.display())]
    ReadDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to read metadata for {}: {source}", .path.display())]
    Metadata {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to create directory {}: {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to copy {} to {}: {source}", .from.display(), .to.display())]
    CopyFile {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to preserve metadata on {}: {source}", .path.display())]
    PreserveMetadata {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Recursively copy the tree under `source` into `dest`, creating `dest`
/// itself.
///
/// Directories are created top-down, each before the files it contains, with
/// the source directory's permissions. Regular files are copied with
/// [`copy_file_preserving`]. Symlinks and other special files are skipped.
pub fn copy_tree(source: &Path, dest: &Path) -> Result<(), CopyError> {
    fs::create_dir_all(dest).map_err(|e| CopyError::CreateDir {
        path: dest.to_path_buf(),
        source: e,
    })?;

    let dir_metadata = fs::metadata(source).map_err(|e| CopyError::Metadata {
        path: source.to_path_buf(),
        source: e,
    })?;
    fs::set_permissions(dest, dir_metadata.permissions()).map_err(|e| {
        CopyError::PreserveMetadata {
            path: dest.to_path_buf(),
            source: e,
        }
    })?;

    let entries = fs::read_dir(source).map_err(|e| CopyError::ReadDir {
        path: source.to_path_buf(),
        source: e,
    })?;

    for entry in entries {
        let entry = entry.map_err(|e| CopyError::ReadDir {
            path: source.to_path_buf(),
            source: e,
        })?;
        let path = entry.path();

        // symlink_metadata so links are classified, not followed
        let metadata = path.symlink_metadata().map_err(|e| CopyError::Metadata {
            path: path.clone(),
            source: e,
        })?;
        let target = dest.join(entry.file_name());

        if metadata.is_dir() {
            copy_tree(&path, &target)?;
        } else if metadata.is_file() {
            copy_file_preserving(&path, &target)?;
        } else {
            debug!(path = %path.display(), "skipping non-regular file");
        }
    }

    Ok(())
}

/// Copy a single regular file, preserving its permissions and its access and
/// modification timestamps. Returns the number of bytes written.
pub fn copy_file_preserving(source: &Path, dest: &Path) -> Result<u64, CopyError> {
    let metadata = fs::metadata(source).map_err(|e| CopyError::Metadata {
        path: source.to_path_buf(),
        source: e,
    })?;

    let source_file = File::open(source).map_err(|e| copy_file_error(source, dest, e))?;
    let mut reader = BufReader::with_capacity(BUFFER_SIZE, source_file);

    let dest_file = File::create(dest).map_err(|e| copy_file_error(source, dest, e))?;
    let mut writer = BufWriter::with_capacity(BUFFER_SIZE, dest_file);

    let mut buffer = vec![0u8; BUFFER_SIZE];
    let mut bytes_written: u64 = 0;

    loop {
        let bytes_read = reader
            .read(&mut buffer)
            .map_err(|e| copy_file_error(source, dest, e))?;
        if bytes_read == 0 {
            break;
        }
        writer
            .write_all(&buffer[..bytes_read])
            .map_err(|e| copy_file_error(source, dest, e))?;
        bytes_written += bytes_read as u64;
    }

    writer.flush().map_err(|e| copy_file_error(source, dest, e))?;

    fs::set_permissions(dest, metadata.permissions()).map_err(|e| {
        CopyError::PreserveMetadata {
            path: dest.to_path_buf(),
            source: e,
        }
    })?;

    let atime = filetime::FileTime::from_last_access_time(&metadata);
    let mtime = filetime::FileTime::from_last_modification_time(&metadata);
    filetime::set_file_times(dest, atime, mtime).map_err(|e| CopyError::PreserveMetadata {
        path: dest.to_path_buf(),
        source: e,
    })?;

    Ok(bytes_written)
}

fn copy_file_error(from: &Path, to: &Path, source: io::Error) -> CopyError {
    CopyError::CopyFile {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use filetime::FileTime;
    use std::fs::Permissions;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::tempdir;

    #[test]
    fn copy_file_preserves_content_permissions_and_mtime() {
        let temp = tempdir().unwrap();
        let source = temp.path().join("source.txt");
        let dest = temp.path().join("dest.txt");

        fs::write(&source, b"test file content").unwrap();
        fs::set_permissions(&source, Permissions::from_mode(0o640)).unwrap();
        let mtime = FileTime::from_unix_time(1_600_000_000, 0);
        filetime::set_file_mtime(&source, mtime).unwrap();

        let written = copy_file_preserving(&source, &dest).unwrap();
        assert_eq!(written, 17);
        assert_eq!(fs::read(&dest).unwrap(), b"test file content");

        let dest_metadata = fs::metadata(&dest).unwrap();
        assert_eq!(dest_metadata.permissions().mode() & 0o777, 0o640);
        assert_eq!(
            FileTime::from_last_modification_time(&dest_metadata),
            mtime
        );
    }

    #[test]
    fn copy_file_fails_on_missing_source() {
        let temp = tempdir().unwrap();
        let result = copy_file_preserving(&temp.path().join("absent"), &temp.path().join("out"));

        match result {
            Err(CopyError::Metadata { path, .. }) => {
                assert!(path.ends_with("absent"));
            }
            other => panic!("expected Metadata error, got {other:?}"),
        }
    }

    #[test]
    fn copy_tree_replicates_nested_structure() {
        let temp = tempdir().unwrap();
        let source = temp.path().join("source");
        let dest = temp.path().join("dest");

        fs::create_dir(&source).unwrap();
        fs::write(source.join("a.txt"), b"hello").unwrap();
        fs::create_dir(source.join("sub")).unwrap();
        fs::write(source.join("sub/b.txt"), b"world").unwrap();

        copy_tree(&source, &dest).unwrap();

        assert_eq!(fs::read(dest.join("a.txt")).unwrap(), b"hello");
        assert_eq!(fs::read(dest.join("sub/b.txt")).unwrap(), b"world");
    }

    #[test]
    fn copy_tree_creates_destination_for_empty_source() {
        let temp = tempdir().unwrap();
        let source = temp.path().join("source");
        let dest = temp.path().join("dest");
        fs::create_dir(&source).unwrap();

        copy_tree(&source, &dest).unwrap();
        assert!(dest.is_dir());
    }

    #[test]
    fn copy_tree_skips_symlinks() {
        let temp = tempdir().unwrap();
        let source = temp.path().join("source");
        let dest = temp.path().join("dest");

        fs::create_dir(&source).unwrap();
        fs::write(source.join("real.txt"), b"data").unwrap();
        std::os::unix::fs::symlink("real.txt", source.join("link.txt")).unwrap();

        copy_tree(&source, &dest).unwrap();

        assert!(dest.join("real.txt").exists());
        assert!(!dest.join("link.txt").exists());
    }

    #[test]
    fn copy_tree_fails_on_missing_source() {
        let temp = tempdir().unwrap();
        let result = copy_tree(&temp.path().join("absent"), &temp.path().join("dest"));
        assert!(result.is_err());
    }
}
