//! File logging. The terminal belongs to the UI, so nothing is written to
//! stdout or stderr.

use color_eyre::{eyre::eyre, Result};
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "CLICKUP_TUI_LOG";
const LOG_DIR: &str = "logs";
const LOG_FILE: &str = "clickup-tui.log";

pub fn log_dir(config_dir: &Path) -> PathBuf {
  config_dir.join(LOG_DIR)
}

/// Install the global subscriber writing to a daily file under
/// `${config_dir}/logs`. Keep the guard alive until exit or buffered lines
/// are lost.
pub fn init(config_dir: &Path) -> Result<WorkerGuard> {
  let dir = log_dir(config_dir);
  std::fs::create_dir_all(&dir)
    .map_err(|e| eyre!("Failed to create log dir {}: {}", dir.display(), e))?;

  let appender = tracing_appender::rolling::daily(&dir, LOG_FILE);
  let (writer, guard) = tracing_appender::non_blocking(appender);

  let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(writer)
    .with_ansi(false)
    .try_init()
    .map_err(|e| eyre!("Failed to install logger: {}", e))?;

  Ok(guard)
}
