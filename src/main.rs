use std::fs;
use std::io::{stdin, stdout};
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use stashd::adapters::UdevEventSource;
use stashd::config::{AppConfig, DEFAULT_STAGING_ROOT};
use stashd::core::catalog;
use stashd::core::{HotplugController, PromotionEngine, StagingEngine};
use stashd::logging::{self, LogConfig};
use tracing::info;

#[derive(Parser)]
#[command(name = "stashd")]
#[command(about = "Automated USB drive backup daemon", long_about = None)]
struct Cli {
    /// Root directory for intermediate staging copies
    #[arg(long, default_value = DEFAULT_STAGING_ROOT)]
    staging_root: PathBuf,

    /// Back up to this directory instead of prompting for a drive
    #[arg(long)]
    destination: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig {
        staging_root: cli.staging_root,
        destination: cli.destination,
        verbose: cli.verbose,
        log_json: cli.log_json,
    };

    logging::init(LogConfig {
        json: config.log_json,
        verbose: config.verbose,
    });

    fs::create_dir_all(&config.staging_root).with_context(|| {
        format!(
            "failed to create staging root {}",
            config.staging_root.display()
        )
    })?;

    let source = UdevEventSource::new().context("failed to open device event source")?;

    let destination = match config.destination {
        Some(directory) => directory,
        None => {
            let drives = catalog::enumerate_removable_drives(&source)
                .context("failed to enumerate removable drives")?;
            if drives.is_empty() {
                bail!("no removable drives available to receive backups");
            }
            catalog::choose_destination(&drives, stdin().lock(), stdout())
                .context("failed to read drive selection")?
        }
    };
    info!(destination = %destination.display(), "backup destination selected");

    let stager = StagingEngine::new(config.staging_root.clone());
    let promoter = PromotionEngine::new(destination);
    let mut controller = HotplugController::new(source, stager, promoter);
    controller.run()
}
