use std::path::PathBuf;

use chrono::{DateTime, Local};
use uuid::Uuid;

/// One backup attempt, created per qualifying attach event and never reused.
#[derive(Debug, Clone)]
pub struct BackupRun {
    /// Correlates all log lines belonging to this run.
    pub id: Uuid,
    pub started_at: DateTime<Local>,
    /// Mount point the device contents were read from.
    pub source: PathBuf,
    /// Set once staging completes. A failed staging attempt records its
    /// partial path on the error instead.
    pub staging_path: Option<PathBuf>,
    pub final_path: Option<PathBuf>,
    pub outcome: RunOutcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Pending,
    Staged,
    Promoted,
    StagingFailed,
    PromotionFailed,
}

impl BackupRun {
    pub fn new(source: PathBuf) -> Self {
        Self {
            id: Uuid::now_v7(),
            started_at: Local::now(),
            source,
            staging_path: None,
            final_path: None,
            outcome: RunOutcome::Pending,
        }
    }
}
