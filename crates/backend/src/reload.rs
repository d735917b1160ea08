//! Reload supervisor - detects changes to the backing file and swaps in fresh generations.
//!
//! # Cycle
//!
//! ```text
//! Idle -> Checking -> Unchanged  -> Idle
//!                  -> Rebuilding -> Idle
//! ```
//!
//! A cycle stats the file and compares its modification time against the
//! watermark (the mtime of the last applied load). Only a strictly newer file
//! is read, parsed into a new store and published to the [`Catalog`]. Any
//! failure leaves the published generation in place.
//!
//! Cycles are triggered by the timer loop in [`Reloader::run`] or on demand
//! through [`Reloader::reload`]. Overlapping cycles are allowed: the watermark
//! lock is only held to compare and update the timestamp, never across I/O,
//! and the catalog refuses to replace a generation read from a newer file.

use std::{
  path::{Path, PathBuf},
  sync::{Arc, Mutex, MutexGuard, PoisonError},
  time::{Duration, SystemTime},
};

use chrono::{DateTime, Utc};
use releasechan_core::{Error, Result};
use serde::Serialize;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace};

use crate::{
  catalog::Catalog,
  loader::{LoadReport, load_from_bytes},
};

/// Where the supervisor is in its cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReloadState {
  Idle,
  Checking,
  Rebuilding,
}

/// Result of one successful check cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReloadOutcome {
  /// The file is not newer than the last applied load
  Unchanged,
  /// A new generation was published
  Reloaded {
    generation: u64,
    releases: usize,
    report: LoadReport,
  },
  /// The file was rebuilt but an overlapping cycle had already published newer data
  Superseded,
}

/// Counters and last-known facts about the supervisor, for health reporting
#[derive(Debug, Clone, Serialize)]
pub struct ReloadStatus {
  pub state: ReloadState,
  pub checks: u64,
  pub reloads: u64,
  pub failures: u64,
  pub last_error: Option<String>,
  pub last_checked_at: Option<DateTime<Utc>>,
  pub last_reload_at: Option<DateTime<Utc>>,
  /// Modification time of the file behind the live generation
  pub source_modified: Option<DateTime<Utc>>,
}

impl Default for ReloadStatus {
  fn default() -> Self {
    Self {
      state: ReloadState::Idle,
      checks: 0,
      reloads: 0,
      failures: 0,
      last_error: None,
      last_checked_at: None,
      last_reload_at: None,
      source_modified: None,
    }
  }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
  mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Status plus the number of cycles in flight, behind one lock.
///
/// The reported state is derived from the counts: `Rebuilding` while any
/// cycle rebuilds, `Checking` while any cycle is running, `Idle` otherwise.
#[derive(Default)]
struct Tracker {
  status: ReloadStatus,
  in_flight: usize,
  rebuilding: usize,
}

impl Tracker {
  fn refresh_state(&mut self) {
    self.status.state = if self.rebuilding > 0 {
      ReloadState::Rebuilding
    } else if self.in_flight > 0 {
      ReloadState::Checking
    } else {
      ReloadState::Idle
    };
  }
}

/// Counts one cycle in flight. Dropping it, including when its future is
/// dropped mid-flight, removes the cycle from the counts.
struct CycleGuard<'a> {
  tracker: &'a Mutex<Tracker>,
  rebuilding: bool,
}

impl<'a> CycleGuard<'a> {
  fn enter(tracker: &'a Mutex<Tracker>) -> Self {
    let mut t = lock(tracker);
    t.in_flight += 1;
    t.status.checks += 1;
    t.status.last_checked_at = Some(Utc::now());
    t.refresh_state();
    Self {
      tracker,
      rebuilding: false,
    }
  }

  fn start_rebuild(&mut self) {
    if self.rebuilding {
      return;
    }
    self.rebuilding = true;
    let mut t = lock(self.tracker);
    t.rebuilding += 1;
    t.refresh_state();
    debug!(state = ?t.status.state, "Reload state");
  }
}

impl Drop for CycleGuard<'_> {
  fn drop(&mut self) {
    let mut t = lock(self.tracker);
    t.in_flight = t.in_flight.saturating_sub(1);
    if self.rebuilding {
      t.rebuilding = t.rebuilding.saturating_sub(1);
    }
    t.refresh_state();
  }
}

pub struct Reloader {
  path: PathBuf,
  catalog: Arc<Catalog>,
  watermark: Mutex<Option<SystemTime>>,
  tracker: Mutex<Tracker>,
}

impl Reloader {
  /// Load the backing file for the first time.
  ///
  /// Unlike later reloads, any failure here is returned to the caller: a
  /// service that cannot build its first generation has nothing to serve.
  pub async fn bootstrap(path: impl Into<PathBuf>) -> Result<Self> {
    let path = path.into();

    let metadata = tokio::fs::metadata(&path).await.map_err(|e| Error::io(&path, e))?;
    let modified = metadata.modified().ok();
    let data = tokio::fs::read(&path).await.map_err(|e| Error::io(&path, e))?;
    info!(path = %path.display(), bytes_in = data.len(), "Loading database");

    let loaded = load_from_bytes(&data)?;
    let catalog = Arc::new(Catalog::new(loaded, modified));

    Ok(Self::with_catalog(path, catalog, modified))
  }

  /// Supervise `path` for an already-published catalog. `watermark` is the
  /// modification time the catalog's data was read at, if known.
  pub fn with_catalog(path: impl Into<PathBuf>, catalog: Arc<Catalog>, watermark: Option<SystemTime>) -> Self {
    let tracker = Tracker {
      status: ReloadStatus {
        source_modified: watermark.map(DateTime::<Utc>::from),
        ..Default::default()
      },
      ..Default::default()
    };
    Self {
      path: path.into(),
      catalog,
      watermark: Mutex::new(watermark),
      tracker: Mutex::new(tracker),
    }
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  pub fn catalog(&self) -> &Arc<Catalog> {
    &self.catalog
  }

  pub fn status(&self) -> ReloadStatus {
    lock(&self.tracker).status.clone()
  }

  /// Run one check cycle now and report what happened.
  ///
  /// Errors are logged and returned; the live generation is never touched on failure.
  pub async fn reload(&self) -> Result<ReloadOutcome> {
    let mut guard = CycleGuard::enter(&self.tracker);
    let result = self.check_and_rebuild(&mut guard).await;

    {
      let mut tracker = lock(&self.tracker);
      let status = &mut tracker.status;
      match &result {
        Ok(ReloadOutcome::Reloaded { .. }) => {
          status.reloads += 1;
          status.last_error = None;
          status.last_reload_at = Some(Utc::now());
          status.source_modified = self.watermark().map(DateTime::<Utc>::from);
        }
        Ok(_) => status.last_error = None,
        Err(e) => {
          status.failures += 1;
          status.last_error = Some(e.to_string());
        }
      }
    }

    // Counters are in place before the cycle leaves the in-flight count
    drop(guard);
    result
  }

  async fn check_and_rebuild(&self, guard: &mut CycleGuard<'_>) -> Result<ReloadOutcome> {
    let modified = match tokio::fs::metadata(&self.path).await.and_then(|m| m.modified()) {
      Ok(modified) => modified,
      Err(e) => {
        error!(path = %self.path.display(), error = %e, "Error checking file stat");
        return Err(Error::io(&self.path, e));
      }
    };

    let last = self.watermark();
    if let Some(last) = last
      && modified <= last
    {
      trace!(path = %self.path.display(), "File unchanged");
      return Ok(ReloadOutcome::Unchanged);
    }

    info!(
      old_mod_time = ?last.map(DateTime::<Utc>::from),
      new_mod_time = ?DateTime::<Utc>::from(modified),
      "File changed, reloading database"
    );
    guard.start_rebuild();

    let data = match tokio::fs::read(&self.path).await {
      Ok(data) => data,
      Err(e) => {
        error!(path = %self.path.display(), error = %e, "Error reading database file");
        return Err(Error::io(&self.path, e));
      }
    };

    let loaded = match load_from_bytes(&data) {
      Ok(loaded) => loaded,
      Err(e) => {
        error!(path = %self.path.display(), error = %e, "Error loading new database, keeping previous generation");
        return Err(e);
      }
    };
    let report = loaded.report;

    let Some(generation) = self.catalog.publish_if_newer(loaded, modified) else {
      // The published data came from a newer file; this one needs no second look
      self.advance_watermark(modified);
      info!(path = %self.path.display(), "Newer generation already published, discarding rebuild");
      return Ok(ReloadOutcome::Superseded);
    };
    self.advance_watermark(modified);

    info!(generation = generation.number, "Database reloaded successfully");
    Ok(ReloadOutcome::Reloaded {
      generation: generation.number,
      releases: generation.store.len(),
      report,
    })
  }

  fn watermark(&self) -> Option<SystemTime> {
    *lock(&self.watermark)
  }

  fn advance_watermark(&self, modified: SystemTime) {
    let mut watermark = lock(&self.watermark);
    if watermark.is_none_or(|last| modified > last) {
      *watermark = Some(modified);
    }
  }

  /// Check the file every `period` until cancelled.
  ///
  /// Cancellation also interrupts a cycle in progress; the half-built
  /// generation is dropped without ever becoming visible.
  pub async fn run(&self, period: Duration, cancel: CancellationToken) {
    let mut timer = interval(period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

    // Skip the immediate tick
    timer.tick().await;

    info!(path = %self.path.display(), interval_secs = period.as_secs(), "File watcher started");

    loop {
      tokio::select! {
          biased;

          _ = cancel.cancelled() => break,

          _ = timer.tick() => {
              tokio::select! {
                  biased;

                  _ = cancel.cancelled() => {
                      debug!("Reload interrupted by shutdown");
                      break;
                  }

                  result = self.reload() => {
                      if let Err(e) = result {
                          error!(error = %e, "Error during automatic database reload");
                      }
                  }
              }
          }
      }
    }

    info!("File watcher stopping");
  }
}
