//! Device event source implementations backing the hotplug controller.

#[cfg(target_os = "linux")]
mod linux;
mod simulated;

#[cfg(target_os = "linux")]
pub use linux::UdevEventSource;
pub use simulated::{SimulatedEventSource, Simulator};
