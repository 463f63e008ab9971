use std::path::PathBuf;

/// Root under which intermediate staging copies are created.
pub const DEFAULT_STAGING_ROOT: &str = "/tmp/usb_temp_backup";

pub struct AppConfig {
    pub staging_root: PathBuf,
    /// Final backup destination. `None` means the operator picks a drive
    /// interactively at startup.
    pub destination: Option<PathBuf>,
    pub verbose: bool,
    pub log_json: bool,
}
