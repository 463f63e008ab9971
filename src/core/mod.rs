pub mod catalog;
pub mod controller;
pub mod fs_copy;
pub mod hardware;
pub mod models;
pub mod promoter;
pub mod stager;

pub use catalog::DriveEntry;
pub use controller::HotplugController;
pub use hardware::{DeviceDescriptor, DeviceEvent, DeviceEventSource, is_removable_partition};
pub use models::{BackupRun, RunOutcome};
pub use promoter::{PromotionEngine, PromotionError};
pub use stager::{StagingEngine, StagingError};
