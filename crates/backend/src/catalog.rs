//! The published store generation.
//!
//! `Catalog` is the one piece of shared mutable state in the service: an
//! atomically swappable pointer to an immutable [`Generation`]. Queries load
//! the pointer without locking and keep the generation alive for as long as
//! they hold it; reloads build a new generation off to the side and swap it in.

use std::{sync::Arc, time::SystemTime};

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use releasechan_core::{Release, ReleaseQuery};
use tracing::{debug, info};

use crate::{
  loader::{LoadReport, LoadedStore},
  store::ReleaseStore,
};

/// One complete, immutable snapshot of the indexed store
#[derive(Debug)]
pub struct Generation {
  /// Monotonic per-catalog counter: 1 for the initial load, 0 for an empty catalog
  pub number: u64,
  pub store: Arc<ReleaseStore>,
  /// Modification time of the file this generation was read from
  pub source_modified: Option<SystemTime>,
  pub loaded_at: DateTime<Utc>,
  pub report: LoadReport,
}

impl Generation {
  fn from_loaded(number: u64, store: Arc<ReleaseStore>, report: LoadReport, source_modified: Option<SystemTime>) -> Self {
    Self {
      number,
      store,
      source_modified,
      loaded_at: Utc::now(),
      report,
    }
  }
}

pub struct Catalog {
  current: ArcSwap<Generation>,
}

impl Catalog {
  pub fn new(initial: LoadedStore, source_modified: Option<SystemTime>) -> Self {
    Self::starting_at(1, initial, source_modified)
  }

  /// A catalog serving no releases. Its generation is 0 until the first publish.
  pub fn empty() -> Self {
    Self::starting_at(
      0,
      LoadedStore {
        store: ReleaseStore::new(),
        report: LoadReport::default(),
      },
      None,
    )
  }

  fn starting_at(number: u64, initial: LoadedStore, source_modified: Option<SystemTime>) -> Self {
    let generation = Generation::from_loaded(number, Arc::new(initial.store), initial.report, source_modified);
    Self {
      current: ArcSwap::from_pointee(generation),
    }
  }

  /// A generation built from real data has been published
  pub fn is_loaded(&self) -> bool {
    self.generation() > 0
  }

  /// The generation currently visible to queries
  pub fn snapshot(&self) -> Arc<Generation> {
    self.current.load_full()
  }

  pub fn generation(&self) -> u64 {
    self.current.load().number
  }

  /// Run a query against a single generation.
  pub fn query(&self, query: &ReleaseQuery) -> Vec<Arc<Release>> {
    let generation = self.current.load();
    debug!(
      generation = generation.number,
      container = query.container().unwrap_or_default(),
      release_channel = query.release_channel().unwrap_or_default(),
      "New query"
    );
    generation.store.query(query)
  }

  /// Unconditionally replace the current generation.
  pub fn publish(&self, loaded: LoadedStore, source_modified: Option<SystemTime>) -> Arc<Generation> {
    self
      .swap_in(loaded, source_modified, |_| true)
      .unwrap_or_else(|| self.snapshot())
  }

  /// Replace the current generation unless it was read from a newer file.
  ///
  /// Returns `None` when the candidate is older than what is already
  /// published. Equal modification times re-publish.
  pub fn publish_if_newer(&self, loaded: LoadedStore, source_modified: SystemTime) -> Option<Arc<Generation>> {
    self.swap_in(loaded, Some(source_modified), |current| match current.source_modified {
      Some(published) => source_modified >= published,
      None => true,
    })
  }

  fn swap_in(
    &self,
    loaded: LoadedStore,
    source_modified: Option<SystemTime>,
    accept: impl Fn(&Generation) -> bool,
  ) -> Option<Arc<Generation>> {
    let store = Arc::new(loaded.store);

    loop {
      let current = self.current.load_full();
      if !accept(&*current) {
        debug!(generation = current.number, "Published generation is newer, discarding rebuild");
        return None;
      }

      let next = Arc::new(Generation::from_loaded(
        current.number + 1,
        Arc::clone(&store),
        loaded.report,
        source_modified,
      ));
      let prev = self.current.compare_and_swap(&current, Arc::clone(&next));
      if Arc::ptr_eq(&prev, &current) {
        info!(
          generation = next.number,
          releases = next.store.len(),
          "Published new generation"
        );
        return Some(next);
      }
    }
  }
}

impl Default for Catalog {
  fn default() -> Self {
    Self::empty()
  }
}
