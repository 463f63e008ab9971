use std::path::{Path, PathBuf};

use anyhow::Result;

/// Read-only view of one block-device partition, as supplied by the
/// platform's event source.
///
/// Every field the pipeline consults is optional: hardware event payloads are
/// routinely partial, and an absent attribute must degrade to "not eligible"
/// rather than an error.
#[derive(Debug, Clone, Default)]
pub struct DeviceDescriptor {
    /// Bus the device is attached over, e.g. "usb".
    pub bus: Option<String>,
    /// Device type, e.g. "partition" or "disk".
    pub devtype: Option<String>,
    /// Device node path, e.g. /dev/sdb1.
    pub node: Option<PathBuf>,
    /// Where the partition's contents are accessible, if mounted.
    pub mount_point: Option<PathBuf>,
    /// Raw capacity in bytes.
    pub size_bytes: Option<u64>,
}

impl DeviceDescriptor {
    /// Mount point usable as a copy source or destination, treating the empty
    /// string as absent.
    pub fn usable_mount_point(&self) -> Option<&Path> {
        self.mount_point
            .as_deref()
            .filter(|p| !p.as_os_str().is_empty())
    }
}

#[derive(Debug, Clone)]
pub enum DeviceEvent {
    Attached(DeviceDescriptor),
    /// Carries the device node (or kernel name when no node exists).
    Detached(String),
}

/// Source of block-device partitions and attach/detach notifications.
pub trait DeviceEventSource {
    /// List the block-device partitions currently present.
    fn enumerate_partitions(&self) -> Result<Vec<DeviceDescriptor>>;

    /// Block until the next attach/detach notification.
    ///
    /// `None` means the source is exhausted and no further events will ever
    /// arrive; the udev source never returns it.
    fn next_event(&mut self) -> Result<Option<DeviceEvent>>;
}

/// True iff the descriptor denotes a mountable removable-storage partition:
/// attached over USB and of partition type.
///
/// Absent or malformed attributes classify as false. The predicate has no
/// error channel, so a garbled hardware event can never take down the event
/// loop.
pub fn is_removable_partition(descriptor: &DeviceDescriptor) -> bool {
    descriptor.bus.as_deref() == Some("usb") && descriptor.devtype.as_deref() == Some("partition")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(bus: Option<&str>, devtype: Option<&str>) -> DeviceDescriptor {
        DeviceDescriptor {
            bus: bus.map(str::to_owned),
            devtype: devtype.map(str::to_owned),
            ..Default::default()
        }
    }

    #[test]
    fn usb_partition_is_removable() {
        assert!(is_removable_partition(&descriptor(
            Some("usb"),
            Some("partition")
        )));
    }

    #[test]
    fn other_bus_or_devtype_is_not_removable() {
        assert!(!is_removable_partition(&descriptor(
            Some("ata"),
            Some("partition")
        )));
        assert!(!is_removable_partition(&descriptor(Some("usb"), Some("disk"))));
        assert!(!is_removable_partition(&descriptor(Some("ata"), Some("disk"))));
    }

    #[test]
    fn missing_attributes_classify_as_false() {
        assert!(!is_removable_partition(&descriptor(None, Some("partition"))));
        assert!(!is_removable_partition(&descriptor(Some("usb"), None)));
        assert!(!is_removable_partition(&descriptor(None, None)));
    }

    #[test]
    fn empty_mount_point_is_unusable() {
        let mut d = descriptor(Some("usb"), Some("partition"));
        assert!(d.usable_mount_point().is_none());

        d.mount_point = Some(PathBuf::new());
        assert!(d.usable_mount_point().is_none());

        d.mount_point = Some(PathBuf::from("/media/usb1"));
        assert_eq!(d.usable_mount_point(), Some(Path::new("/media/usb1")));
    }
}
