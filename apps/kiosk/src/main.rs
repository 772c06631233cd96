use kiosk::app;
use kiosk::error::KioskError;
use kiosk::logger::initialize as LoggerInitialize;

use sync_core::config::{CONFIG_FILE_NAME, SyncConfig};

use common::ErrorLocation;

use std::fs::create_dir_all;
use std::panic::Location;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use log::{error, info};

/// Blocking work still running at exit (the console's stdin read) is
/// abandoned after this long.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            eprintln!("kiosk: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), KioskError> {
    if let Ok(path) = dotenvy::dotenv() {
        println!("Loaded environment from {}", path.display());
    }

    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME));
    let config = SyncConfig::load_with_env(&config_path)?;

    let log_dir = config.logging.directory.clone();
    create_dir_all(&log_dir).map_err(|e| KioskError::Kiosk {
        message: format!("Failed to create log directory {}: {e}", log_dir.display()),
        location: ErrorLocation::from(Location::caller()),
    })?;
    LoggerInitialize(&log_dir)?;

    info!("Kiosk starting with config {}", config_path.display());
    info!("Log directory: {}", log_dir.display());

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let result = runtime.block_on(app::run(config));
    runtime.shutdown_timeout(SHUTDOWN_GRACE);

    info!("Kiosk stopped");
    result
}
