//! In-memory event source for exercising the controller without hardware.

use std::sync::{Arc, Mutex, mpsc};

use anyhow::Result;

use crate::core::hardware::{DeviceDescriptor, DeviceEvent, DeviceEventSource};

/// Event source fed by a [`Simulator`] handle.
///
/// Events travel over a rendezvous channel: an injected event is delivered
/// only if the controller is currently blocked in `next_event`, otherwise it
/// is lost. That is the same contract the real hotplug loop has while a
/// backup run is in progress.
pub struct SimulatedEventSource {
    devices: Arc<Mutex<Vec<DeviceDescriptor>>>,
    events: mpsc::Receiver<DeviceEvent>,
}

/// Injection handle for a [`SimulatedEventSource`].
#[derive(Clone)]
pub struct Simulator {
    devices: Arc<Mutex<Vec<DeviceDescriptor>>>,
    events: mpsc::SyncSender<DeviceEvent>,
}

impl SimulatedEventSource {
    pub fn new() -> (Self, Simulator) {
        let (tx, rx) = mpsc::sync_channel(0);
        let devices = Arc::new(Mutex::new(Vec::new()));

        (
            Self {
                devices: devices.clone(),
                events: rx,
            },
            Simulator {
                devices,
                events: tx,
            },
        )
    }
}

impl Simulator {
    /// Replace the set of currently present partitions seen by enumeration.
    pub fn set_present_devices(&self, devices: Vec<DeviceDescriptor>) {
        *self.devices.lock().unwrap() = devices;
    }

    /// Deliver an attach event, waiting until the receiver picks it up.
    /// Returns once delivered (or once the receiver is gone).
    pub fn attach(&self, descriptor: DeviceDescriptor) {
        let _ = self.events.send(DeviceEvent::Attached(descriptor));
    }

    /// Attempt to deliver an attach event without waiting. Returns false if
    /// nobody was listening and the event was dropped.
    pub fn try_attach(&self, descriptor: DeviceDescriptor) -> bool {
        self.events
            .try_send(DeviceEvent::Attached(descriptor))
            .is_ok()
    }

    /// Deliver a detach event, waiting until the receiver picks it up.
    pub fn detach(&self, node: &str) {
        let _ = self.events.send(DeviceEvent::Detached(node.to_string()));
    }
}

impl DeviceEventSource for SimulatedEventSource {
    fn enumerate_partitions(&self) -> Result<Vec<DeviceDescriptor>> {
        Ok(self.devices.lock().unwrap().clone())
    }

    /// Blocks until the next injected event; returns `None` once every
    /// [`Simulator`] handle has been dropped.
    fn next_event(&mut self) -> Result<Option<DeviceEvent>> {
        Ok(self.events.recv().ok())
    }
}
