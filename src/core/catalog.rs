//! Enumeration of attached removable drives and interactive selection of the
//! backup destination.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::Result;
use tracing::debug;

use crate::core::hardware::{DeviceEventSource, is_removable_partition};

const GIB: u64 = 1024 * 1024 * 1024;

/// One selectable drive in a catalog snapshot.
#[derive(Debug, Clone)]
pub struct DriveEntry {
    /// 1-based position in enumeration order, stable for one snapshot.
    pub index: usize,
    pub device_node: String,
    /// Whole gibibytes, or "Unknown" when the size attribute is unreadable.
    pub size: String,
    pub mount_point: PathBuf,
}

/// Enumerate the removable partitions that are currently mounted and could
/// therefore serve as a backup destination.
///
/// Partitions without a readable mount point are silently excluded; indices
/// stay contiguous regardless of how many devices were skipped.
pub fn enumerate_removable_drives(source: &dyn DeviceEventSource) -> Result<Vec<DriveEntry>> {
    let mut drives = Vec::new();

    for descriptor in source.enumerate_partitions()? {
        if !is_removable_partition(&descriptor) {
            continue;
        }
        let Some(mount_point) = descriptor.usable_mount_point() else {
            debug!(node = ?descriptor.node, "skipping removable partition without a mount point");
            continue;
        };

        drives.push(DriveEntry {
            index: drives.len() + 1,
            device_node: descriptor
                .node
                .as_ref()
                .map(|n| n.display().to_string())
                .unwrap_or_else(|| "unknown".to_string()),
            size: format_size(descriptor.size_bytes),
            mount_point: mount_point.to_path_buf(),
        });
    }

    Ok(drives)
}

fn format_size(bytes: Option<u64>) -> String {
    match bytes {
        Some(bytes) => format!("{} GB", bytes / GIB),
        None => "Unknown".to_string(),
    }
}

/// Present the catalog and prompt until a valid index is chosen, returning
/// the chosen drive's mount point.
///
/// Non-numeric and out-of-range input is reported and re-prompted, never
/// fatal. The caller must have rejected an empty catalog already.
pub fn choose_destination(
    drives: &[DriveEntry],
    input: impl BufRead,
    mut output: impl Write,
) -> io::Result<PathBuf> {
    writeln!(output, "Available drives:")?;
    for drive in drives {
        writeln!(
            output,
            "  {}: {} (device: {}, size: {})",
            drive.index,
            drive.mount_point.display(),
            drive.device_node,
            drive.size
        )?;
    }

    let mut lines = input.lines();
    loop {
        write!(output, "Choose a drive to receive backups (number): ")?;
        output.flush()?;

        let line = match lines.next() {
            Some(line) => line?,
            None => {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "input closed before a drive was chosen",
                ));
            }
        };

        if let Ok(choice) = line.trim().parse::<usize>() {
            if let Some(drive) = drives.iter().find(|d| d.index == choice) {
                return Ok(drive.mount_point.clone());
            }
        }
        writeln!(output, "Invalid choice, try again.")?;
    }
}
