//! Test helpers for reload and service tests.
//!
//! Provides `ReloadTestContext`, which owns a temporary release document and
//! pins its modification time so change detection does not depend on the
//! filesystem's timestamp resolution.

use std::{
  path::PathBuf,
  sync::Arc,
  time::{Duration, Instant},
};

use filetime::FileTime;
use releasechan_core::Release;
use tempfile::TempDir;

use crate::{loader::encode_releases, reload::Reloader, service::ReleaseService};

/// Base modification time for test documents (seconds since the epoch)
pub const BASE_MTIME: i64 = 1_700_000_000;

pub struct ReloadTestContext {
  /// Keeps the directory alive for the duration of the test
  pub dir: TempDir,
  pub path: PathBuf,
}

impl ReloadTestContext {
  pub fn new() -> Self {
    let dir = TempDir::new().expect("create temp dir");
    let path = dir.path().join("db.json");
    Self { dir, path }
  }

  /// Write a valid document and set its mtime to `BASE_MTIME + offset_secs`.
  pub fn write_releases(&self, releases: &[(&str, &str, &str)], offset_secs: i64) {
    let releases: Vec<Arc<Release>> = releases
      .iter()
      .map(|(container, channel, image)| Arc::new(Release::new(*container, *channel, *image).expect("valid release")))
      .collect();
    let bytes = encode_releases(&releases).expect("encode releases");
    self.write_raw(&bytes, offset_secs);
  }

  /// Write arbitrary bytes and set the mtime to `BASE_MTIME + offset_secs`.
  pub fn write_raw(&self, bytes: &[u8], offset_secs: i64) {
    std::fs::write(&self.path, bytes).expect("write release document");
    self.set_mtime(offset_secs);
  }

  pub fn set_mtime(&self, offset_secs: i64) {
    let mtime = FileTime::from_unix_time(BASE_MTIME + offset_secs, 0);
    filetime::set_file_mtime(&self.path, mtime).expect("set mtime");
  }

  pub async fn reloader(&self) -> Arc<Reloader> {
    Arc::new(Reloader::bootstrap(&self.path).await.expect("bootstrap reloader"))
  }

  pub async fn service(&self) -> ReleaseService {
    ReleaseService::new(self.reloader().await)
  }
}

/// Poll `condition` until it holds or `timeout` elapses.
pub async fn wait_for(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
  let deadline = Instant::now() + timeout;
  while Instant::now() < deadline {
    if condition() {
      return true;
    }
    tokio::time::sleep(Duration::from_millis(20)).await;
  }
  condition()
}

/// The image paths the service currently returns for a container, in order.
pub fn images_for(service: &ReleaseService, container: &str) -> Vec<String> {
  service
    .query(Some(container), None)
    .iter()
    .map(|r| r.image_path.clone())
    .collect()
}
