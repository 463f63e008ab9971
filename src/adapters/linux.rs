//! udev-backed device event source.
//!
//! Enumeration walks the udev database for block partitions; notifications
//! come from a netlink monitor socket filtered to the same. The monitor
//! socket is non-blocking, so `next_event` parks in poll(2) until it becomes
//! readable.

use std::fs;
use std::os::fd::{AsRawFd, BorrowedFd};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use nix::errno::Errno;
use nix::poll::{PollFd, PollFlags, PollTimeout, poll};
use tracing::debug;

use crate::core::hardware::{DeviceDescriptor, DeviceEvent, DeviceEventSource};

/// sysfs `size` attributes count 512-byte sectors regardless of the device's
/// logical block size.
const SECTOR_SIZE: u64 = 512;

pub struct UdevEventSource {
    socket: udev::MonitorSocket,
}

impl UdevEventSource {
    pub fn new() -> Result<Self> {
        let socket = udev::MonitorBuilder::new()
            .context("failed to create udev monitor")?
            .match_subsystem_devtype("block", "partition")
            .context("failed to filter udev monitor")?
            .listen()
            .context("failed to bind udev monitor socket")?;

        Ok(Self { socket })
    }
}

impl DeviceEventSource for UdevEventSource {
    fn enumerate_partitions(&self) -> Result<Vec<DeviceDescriptor>> {
        let mut enumerator = udev::Enumerator::new().context("failed to create udev enumerator")?;
        enumerator
            .match_subsystem("block")
            .context("failed to filter udev enumerator")?;
        enumerator
            .match_property("DEVTYPE", "partition")
            .context("failed to filter udev enumerator")?;

        let devices = enumerator
            .scan_devices()
            .context("failed to scan udev devices")?;

        Ok(devices.map(|device| descriptor_from(&device)).collect())
    }

    fn next_event(&mut self) -> Result<Option<DeviceEvent>> {
        loop {
            for event in self.socket.iter() {
                match event.event_type() {
                    udev::EventType::Add => {
                        return Ok(Some(DeviceEvent::Attached(descriptor_from(&event))));
                    }
                    udev::EventType::Remove => {
                        return Ok(Some(DeviceEvent::Detached(node_name(&event))));
                    }
                    other => debug!(event_type = ?other, "ignoring udev event"),
                }
            }
            wait_readable(&self.socket)?;
        }
    }
}

fn wait_readable(socket: &udev::MonitorSocket) -> Result<()> {
    let fd = unsafe { BorrowedFd::borrow_raw(socket.as_raw_fd()) };
    let mut fds = [PollFd::new(fd, PollFlags::POLLIN)];

    match poll(&mut fds, PollTimeout::NONE) {
        Ok(_) | Err(Errno::EINTR) => Ok(()),
        Err(e) => Err(e).context("failed to poll udev monitor socket"),
    }
}

fn descriptor_from(device: &udev::Device) -> DeviceDescriptor {
    let node = device.devnode().map(Path::to_path_buf);
    // udev events rarely carry mount information themselves, so fall back to
    // the process's mount table.
    let mount_point = device
        .property_value("ID_FS_MOUNTPOINT")
        .map(PathBuf::from)
        .or_else(|| node.as_deref().and_then(mount_point_of));

    DeviceDescriptor {
        bus: utf8_property(device, "ID_BUS"),
        devtype: device.devtype().and_then(|v| v.to_str()).map(str::to_owned),
        node,
        mount_point,
        size_bytes: device
            .attribute_value("size")
            .and_then(|v| v.to_str())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(|sectors| sectors * SECTOR_SIZE),
    }
}

fn utf8_property(device: &udev::Device, name: &str) -> Option<String> {
    device
        .property_value(name)
        .and_then(|v| v.to_str())
        .map(str::to_owned)
}

fn node_name(device: &udev::Device) -> String {
    device
        .devnode()
        .map(|node| node.display().to_string())
        .unwrap_or_else(|| device.sysname().to_string_lossy().into_owned())
}

fn mount_point_of(node: &Path) -> Option<PathBuf> {
    let mounts = fs::read_to_string("/proc/self/mounts").ok()?;
    find_mount_point(node, &mounts)
}

fn find_mount_point(node: &Path, mounts: &str) -> Option<PathBuf> {
    for line in mounts.lines() {
        let mut fields = line.split_ascii_whitespace();
        let (Some(device), Some(target)) = (fields.next(), fields.next()) else {
            continue;
        };
        if Path::new(device) == node {
            return Some(PathBuf::from(unescape_mount_path(target)));
        }
    }
    None
}

/// Mount table fields escape whitespace and backslashes as three-digit octal
/// sequences (`\040` for space and so on).
fn unescape_mount_path(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut chars = field.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let digits: String = chars.clone().take(3).collect();
        if digits.len() == 3 {
            if let Ok(code) = u8::from_str_radix(&digits, 8) {
                out.push(code as char);
                chars.nth(2);
                continue;
            }
        }
        out.push(c);
    }

    out
}
