//! CLI command implementations

pub mod auth;
pub mod logs;
pub mod reset;
pub mod status;
pub mod town;

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use renizo_core::{EntryPoint, LogEvent, LoggingService, RenizoContext};
use tracing::debug;

/// Env var pointing at the data directory
const DIR_ENV: &str = "RENIZO_DIR";

/// Get the renizo directory from environment or default
pub fn get_renizo_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(DIR_ENV) {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|home| home.join(".renizo"))
        .ok_or_else(|| anyhow!("Could not find home directory; set {}", DIR_ENV))
}

/// Get the logging service for CLI operations
///
/// Returns None if logging fails to initialize (shouldn't block operations)
pub fn get_logger() -> Option<LoggingService> {
    let renizo_dir = get_renizo_dir().ok()?;
    std::fs::create_dir_all(&renizo_dir).ok()?;
    match LoggingService::new(&renizo_dir, EntryPoint::Cli, env!("CARGO_PKG_VERSION")) {
        Ok(logger) => Some(logger),
        Err(e) => {
            debug!("Event log unavailable: {:#}", e);
            None
        }
    }
}

/// Log an event, ignoring any errors (logging should never break the app)
pub fn log_event(logger: &Option<LoggingService>, event: LogEvent) {
    if let Some(l) = logger {
        if let Err(e) = l.log(event) {
            debug!("Failed to record event: {:#}", e);
        }
    }
}

/// Build the app context on the renizo directory
pub fn get_context() -> Result<RenizoContext> {
    let renizo_dir = get_renizo_dir()?;

    std::fs::create_dir_all(&renizo_dir)
        .with_context(|| format!("Failed to create renizo directory: {:?}", renizo_dir))?;

    RenizoContext::new(&renizo_dir).context("Failed to initialize renizo context")
}
