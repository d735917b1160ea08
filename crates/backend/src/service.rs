//! Query facade shared by whatever transport fronts the service.
//!
//! A `ReleaseService` is the explicit context handed to request handlers: it
//! owns handles to the published catalog and to the reload supervisor, and is
//! cheap to clone. Nothing here blocks on I/O except [`ReleaseService::reload`].

use std::sync::Arc;

use releasechan_core::{Release, ReleaseQuery, Result};
use serde::Serialize;

use crate::{
  catalog::Catalog,
  reload::{ReloadOutcome, ReloadStatus, Reloader},
};

/// Query result with the found/not-found distinction callers map to status codes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryResult {
  Found(Vec<Arc<Release>>),
  NotFound,
}

impl QueryResult {
  pub fn is_found(&self) -> bool {
    matches!(self, Self::Found(_))
  }

  /// The matching releases, empty when nothing was found
  pub fn into_releases(self) -> Vec<Arc<Release>> {
    match self {
      Self::Found(releases) => releases,
      Self::NotFound => Vec::new(),
    }
  }
}

/// Readiness and health facts about the running service
#[derive(Debug, Clone, Serialize)]
pub struct Health {
  /// A generation built from the backing file is published
  pub ready: bool,
  /// The last reload attempt failed, so queries are served from older data
  pub stale: bool,
  pub generation: u64,
  pub releases: usize,
  pub containers: usize,
  pub channels: usize,
  pub source: String,
  pub reload: ReloadStatus,
}

#[derive(Clone)]
pub struct ReleaseService {
  catalog: Arc<Catalog>,
  reloader: Arc<Reloader>,
}

impl ReleaseService {
  pub fn new(reloader: Arc<Reloader>) -> Self {
    Self {
      catalog: Arc::clone(reloader.catalog()),
      reloader,
    }
  }

  /// Look up releases by optional container and optional channel.
  ///
  /// Both set: exact pair. One set: everything for it, in load order.
  /// Neither: the whole dataset.
  pub fn query(&self, container: Option<&str>, release_channel: Option<&str>) -> Vec<Arc<Release>> {
    self.catalog.query(&ReleaseQuery::new(container, release_channel))
  }

  pub fn find(&self, query: &ReleaseQuery) -> QueryResult {
    let releases = self.catalog.query(query);
    if releases.is_empty() {
      QueryResult::NotFound
    } else {
      QueryResult::Found(releases)
    }
  }

  /// Check the backing file now, reloading it if it changed.
  pub async fn reload(&self) -> Result<ReloadOutcome> {
    self.reloader.reload().await
  }

  pub fn health(&self) -> Health {
    let generation = self.catalog.snapshot();
    let reload = self.reloader.status();

    Health {
      ready: generation.number > 0,
      stale: reload.last_error.is_some(),
      generation: generation.number,
      releases: generation.store.len(),
      containers: generation.store.containers().len(),
      channels: generation.store.channels().len(),
      source: self.reloader.path().display().to_string(),
      reload,
    }
  }

  pub fn catalog(&self) -> &Arc<Catalog> {
    &self.catalog
  }

  pub fn reloader(&self) -> &Arc<Reloader> {
    &self.reloader
  }
}
