//! The hotplug event loop driving the backup pipeline.

use std::path::PathBuf;

use anyhow::Result;
use tracing::{debug, error, info};

use crate::core::hardware::{
    DeviceDescriptor, DeviceEvent, DeviceEventSource, is_removable_partition,
};
use crate::core::models::{BackupRun, RunOutcome};
use crate::core::promoter::PromotionEngine;
use crate::core::stager::StagingEngine;

/// Waits for device attach notifications and runs the staged backup
/// pipeline for each qualifying one.
///
/// The controller is single-threaded and synchronous: one run is processed to
/// completion before the next event is requested, so notifications arriving
/// mid-run are never observed. Per-run failures are logged and the controller
/// goes back to waiting; nothing below it terminates the process.
pub struct HotplugController<S: DeviceEventSource> {
    events: S,
    stager: StagingEngine,
    promoter: PromotionEngine,
}

impl<S: DeviceEventSource> HotplugController<S> {
    pub fn new(events: S, stager: StagingEngine, promoter: PromotionEngine) -> Self {
        Self {
            events,
            stager,
            promoter,
        }
    }

    /// Run until the event source is exhausted. The udev source never is, so
    /// in production this blocks until the process is terminated.
    pub fn run(&mut self) -> Result<()> {
        info!("waiting for device attach events");

        while let Some(event) = self.events.next_event()? {
            self.handle_event(event);
        }

        debug!("event source exhausted, controller stopping");
        Ok(())
    }

    /// Dispatch one event. Returns the Backup Run for qualifying attach
    /// events and `None` for everything ignored.
    pub fn handle_event(&self, event: DeviceEvent) -> Option<BackupRun> {
        match event {
            DeviceEvent::Attached(descriptor) => self.handle_attached(descriptor),
            DeviceEvent::Detached(node) => {
                debug!(node = %node, "device detached, ignoring");
                None
            }
        }
    }

    fn handle_attached(&self, descriptor: DeviceDescriptor) -> Option<BackupRun> {
        if !is_removable_partition(&descriptor) {
            debug!(node = ?descriptor.node, "attached device is not a removable partition, ignoring");
            return None;
        }
        let Some(mount_point) = descriptor.usable_mount_point() else {
            debug!(node = ?descriptor.node, "removable partition has no mount point, ignoring");
            return None;
        };

        Some(self.process(mount_point.to_path_buf()))
    }

    /// One full backup run: stage the mounted tree, then promote the staged
    /// copy. Either failure ends the run; the controller stays up.
    fn process(&self, mount_point: PathBuf) -> BackupRun {
        let mut run = BackupRun::new(mount_point);
        info!(
            run_id = %run.id,
            source = %run.source.display(),
            "removable partition attached, starting backup run"
        );

        let staging_path = match self.stager.stage(&run.source) {
            Ok(path) => path,
            Err(e) => {
                run.outcome = RunOutcome::StagingFailed;
                error!(
                    run_id = %run.id,
                    staging = %e.staging_path.display(),
                    error = %e.source,
                    "staging failed, partial copy left in place"
                );
                return run;
            }
        };
        run.staging_path = Some(staging_path.clone());
        run.outcome = RunOutcome::Staged;

        match self.promoter.promote(&staging_path) {
            Ok(final_path) => {
                run.final_path = Some(final_path);
                run.outcome = RunOutcome::Promoted;
                info!(run_id = %run.id, "backup run complete");
            }
            Err(e) => {
                run.outcome = RunOutcome::PromotionFailed;
                error!(
                    run_id = %run.id,
                    error = %e,
                    "promotion failed, staged copy retained"
                );
            }
        }

        run
    }
}
