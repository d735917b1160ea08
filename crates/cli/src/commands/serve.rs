//! Serve command

use anyhow::{Context, Result};
use releasechan::{Daemon, RuntimeConfig};
use releasechan_core::Config;
use std::path::PathBuf;
use tracing::info;

/// Start the daemon and run until ctrl-c
pub async fn cmd_serve(config: &Config, file: Option<PathBuf>) -> Result<()> {
  let mut runtime_config = RuntimeConfig::from_config(config);
  if let Some(file) = file {
    runtime_config = runtime_config.with_data_file(file);
  }

  info!(
    reload = runtime_config.reload.enabled,
    interval_secs = runtime_config.reload.interval().as_secs(),
    "Starting releasechan daemon"
  );
  Daemon::new(runtime_config).run().await.context("Failed to run daemon")?;

  Ok(())
}
