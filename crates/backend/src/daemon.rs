//! Daemon lifecycle management.
//!
//! The daemon owns the startup load, the background reload task and the
//! shutdown sequence. Request handling lives outside this crate and talks to
//! the daemon through the [`ReleaseService`] it hands out.
//!
//! # Architecture
//!
//! ```text
//! Daemon (Supervisor)
//!   ├── ReleaseService (query facade, cloned into request handlers)
//!   │     └── Catalog (ArcSwap<Generation>)
//!   └── Reloader task (timer-driven, child CancellationToken)
//! ```
//!
//! # Lifecycle
//!
//! 1. Load the backing file; any failure aborts startup
//! 2. Create master `CancellationToken`
//! 3. Spawn the reload loop with a child token (when enabled)
//! 4. Serve until cancelled (ctrl-c in [`Daemon::run`])
//! 5. Graceful shutdown: cancel, wait for the reload task

use std::{path::PathBuf, sync::Arc};

use releasechan_core::{Config, ReloadConfig, Result};
use tokio::{signal, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{reload::Reloader, service::ReleaseService};

// ============================================================================
// Configuration
// ============================================================================

/// Daemon runtime configuration.
///
/// Constructed from the config file with optional command-line overrides.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
  /// Backing release document
  pub data_file: PathBuf,
  /// Live-reload settings
  pub reload: ReloadConfig,
}

impl RuntimeConfig {
  pub fn from_config(config: &Config) -> Self {
    Self {
      data_file: config.data.file.clone(),
      reload: config.reload.clone(),
    }
  }

  pub fn with_data_file(mut self, data_file: impl Into<PathBuf>) -> Self {
    self.data_file = data_file.into();
    self
  }
}

// ============================================================================
// Daemon
// ============================================================================

/// The release channel daemon.
///
/// # Usage
///
/// ```ignore
/// let running = Daemon::new(runtime_config).start().await?;
/// let releases = running.service().query(Some("app"), None);
/// running.shutdown().await;
/// ```
pub struct Daemon {
  runtime_config: RuntimeConfig,
}

impl Daemon {
  pub fn new(runtime_config: RuntimeConfig) -> Self {
    Self { runtime_config }
  }

  /// Load the initial generation and start background tasks.
  pub async fn start(self) -> Result<RunningDaemon> {
    info!(version = env!("CARGO_PKG_VERSION"), "Starting release channel daemon");
    info!("Data file: {:?}", self.runtime_config.data_file);

    let reloader = Arc::new(Reloader::bootstrap(&self.runtime_config.data_file).await?);
    let service = ReleaseService::new(Arc::clone(&reloader));

    // Master cancellation token - propagates to all children
    let cancel = CancellationToken::new();

    let reload_task = if self.runtime_config.reload.enabled {
      let period = self.runtime_config.reload.interval();
      let token = cancel.child_token();
      Some(tokio::spawn(async move {
        reloader.run(period, token).await;
      }))
    } else {
      info!("Timer-driven reload disabled, on-demand reload only");
      None
    };

    Ok(RunningDaemon {
      service,
      cancel,
      reload_task,
    })
  }

  /// Run until ctrl-c, then shut down cleanly.
  pub async fn run(self) -> Result<()> {
    let running = self.start().await?;

    let cancel = running.cancel_token();
    tokio::spawn(async move {
      if let Err(e) = signal::ctrl_c().await {
        warn!("Failed to listen for ctrl-c: {}", e);
        return;
      }
      info!("Received ctrl-c, shutting down...");
      cancel.cancel();
    });

    running.cancelled().await;
    running.shutdown().await;
    Ok(())
  }
}

/// A started daemon: the service handle plus the background work to stop on shutdown.
pub struct RunningDaemon {
  service: ReleaseService,
  cancel: CancellationToken,
  reload_task: Option<JoinHandle<()>>,
}

impl RunningDaemon {
  pub fn service(&self) -> &ReleaseService {
    &self.service
  }

  pub fn cancel_token(&self) -> CancellationToken {
    self.cancel.clone()
  }

  /// Resolves once shutdown has been requested
  pub async fn cancelled(&self) {
    self.cancel.cancelled().await
  }

  pub async fn shutdown(self) {
    info!("Shutting down...");
    self.cancel.cancel();

    if let Some(task) = self.reload_task
      && let Err(e) = task.await
    {
      warn!("Reload task ended abnormally: {}", e);
    }

    info!("Daemon shutdown complete");
  }
}
