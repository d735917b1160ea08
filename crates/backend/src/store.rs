//! In-memory indexed release store.
//!
//! A `ReleaseStore` is one generation of release data: the full write-ordered
//! list plus three indices (by composite key, by container, by channel). It is
//! filled once by the loader and then frozen behind an `Arc` by the catalog,
//! so nothing mutates a store that queries can see.
//!
//! Writes are idempotent by [`ReleaseKey`] across every index. Rewriting a key
//! replaces the record in place: the position of the first write is kept and
//! the value of the last write wins. The container and channel indices hold
//! positions into the full list, so they never see stale duplicates.

use std::{collections::HashMap, sync::Arc};

use releasechan_core::{QueryShape, Release, ReleaseKey, ReleaseQuery, ValidationResult};
use tracing::{debug, trace};

/// What a successful write did to the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
  Inserted,
  /// An earlier release with the same key was overwritten
  Replaced,
}

#[derive(Debug, Default, Clone)]
pub struct ReleaseStore {
  all: Vec<Arc<Release>>,
  by_key: HashMap<ReleaseKey, usize>,
  by_container: HashMap<String, Vec<usize>>,
  by_channel: HashMap<String, Vec<usize>>,
}

impl ReleaseStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Add a release to every index.
  ///
  /// Fails without touching the store if any field is empty.
  pub fn write(&mut self, release: Release) -> ValidationResult<WriteOutcome> {
    release.validate()?;
    trace!(
      container = %release.container,
      release_channel = %release.release_channel,
      image_path = %release.image_path,
      "New entry"
    );

    let key = release.key();
    if let Some(&pos) = self.by_key.get(&key) {
      debug!(key = %key, "Replacing existing release");
      self.all[pos] = Arc::new(release);
      return Ok(WriteOutcome::Replaced);
    }

    let pos = self.all.len();
    self.by_container.entry(release.container.clone()).or_default().push(pos);
    self.by_channel.entry(release.release_channel.clone()).or_default().push(pos);
    self.by_key.insert(key, pos);
    self.all.push(Arc::new(release));

    Ok(WriteOutcome::Inserted)
  }

  /// Answer a partial-key query. No match is an empty result, never an error.
  pub fn query(&self, query: &ReleaseQuery) -> Vec<Arc<Release>> {
    match query.shape() {
      QueryShape::Exact(key) => match self.by_key.get(&key) {
        Some(&pos) => vec![Arc::clone(&self.all[pos])],
        None => {
          debug!(key = %key, "Empty result in search by key");
          Vec::new()
        }
      },
      QueryShape::Container(container) => self.resolve(self.by_container.get(container), "container", container),
      QueryShape::Channel(channel) => self.resolve(self.by_channel.get(channel), "release channel", channel),
      QueryShape::All => {
        debug!(releases = self.all.len(), "Full store dump");
        self.all.clone()
      }
    }
  }

  fn resolve(&self, positions: Option<&Vec<usize>>, index: &str, value: &str) -> Vec<Arc<Release>> {
    match positions {
      Some(positions) => positions.iter().map(|&pos| Arc::clone(&self.all[pos])).collect(),
      None => {
        debug!("Empty result in search by {} for {}", index, value);
        Vec::new()
      }
    }
  }

  /// All releases in write order
  pub fn releases(&self) -> &[Arc<Release>] {
    &self.all
  }

  pub fn get(&self, key: &ReleaseKey) -> Option<&Arc<Release>> {
    self.by_key.get(key).map(|&pos| &self.all[pos])
  }

  pub fn len(&self) -> usize {
    self.all.len()
  }

  pub fn is_empty(&self) -> bool {
    self.all.is_empty()
  }

  /// Distinct container names, sorted
  pub fn containers(&self) -> Vec<&str> {
    let mut names: Vec<&str> = self.by_container.keys().map(String::as_str).collect();
    names.sort_unstable();
    names
  }

  /// Distinct release channel names, sorted
  pub fn channels(&self) -> Vec<&str> {
    let mut names: Vec<&str> = self.by_channel.keys().map(String::as_str).collect();
    names.sort_unstable();
    names
  }
}
