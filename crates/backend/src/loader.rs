//! Building a store generation from the persisted release document.
//!
//! The document is a JSON object with a `releases` list:
//!
//! ```text
//! {"releases": [{"container": "app", "releaseChannel": "dev", "imagePath": "img:dev"}]}
//! ```
//!
//! A blob that is not a JSON object aborts the load. Individual records that
//! fail to decode or validate are logged with their index and skipped.

use std::sync::Arc;

use releasechan_core::{Error, Release, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::store::{ReleaseStore, WriteOutcome};

/// Counts describing one load
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
  /// Records written to the store (including ones that replaced an earlier key)
  pub accepted: usize,
  /// Records skipped because they failed to decode or validate
  pub rejected: usize,
  /// Accepted records that overwrote an earlier record with the same key
  pub replaced: usize,
}

/// A freshly built, not yet published, store generation
#[derive(Debug)]
pub struct LoadedStore {
  pub store: ReleaseStore,
  pub report: LoadReport,
}

/// Wire shape of a single record. Missing fields decode as empty so they are
/// reported by validation instead of failing the record's decode.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReleaseRecord {
  #[serde(default)]
  container: String,
  #[serde(default)]
  release_channel: String,
  #[serde(default)]
  image_path: String,
}

impl From<ReleaseRecord> for Release {
  fn from(record: ReleaseRecord) -> Self {
    Self {
      container: record.container,
      release_channel: record.release_channel,
      image_path: record.image_path,
    }
  }
}

#[derive(Serialize)]
struct ReleaseDocument<'a> {
  releases: Vec<&'a Release>,
}

fn malformed(msg: &str) -> Error {
  Error::malformed(<serde_json::Error as serde::de::Error>::custom(msg))
}

/// Parse a release document and build a brand-new store from it.
pub fn load_from_bytes(blob: &[u8]) -> Result<LoadedStore> {
  let document: Value = serde_json::from_slice(blob).map_err(Error::malformed)?;

  let Value::Object(mut document) = document else {
    return Err(malformed("expected a JSON object with a `releases` list"));
  };

  let records = match document.remove("releases") {
    Some(Value::Array(records)) => records,
    None | Some(Value::Null) => Vec::new(),
    Some(_) => return Err(malformed("`releases` must be a list")),
  };

  let mut store = ReleaseStore::new();
  let mut report = LoadReport::default();

  for (index, value) in records.into_iter().enumerate() {
    let record: ReleaseRecord = match serde_json::from_value(value) {
      Ok(record) => record,
      Err(e) => {
        warn!(index, error = %e, "Skipping undecodable release record");
        report.rejected += 1;
        continue;
      }
    };

    match store.write(record.into()) {
      Ok(outcome) => {
        report.accepted += 1;
        if outcome == WriteOutcome::Replaced {
          report.replaced += 1;
        }
      }
      Err(e) => {
        warn!(index, field = %e.field, "Skipping invalid release record: {}", e.message);
        report.rejected += 1;
      }
    }
  }

  debug!(
    containers = store.containers().len(),
    channels = store.channels().len(),
    "Indices built"
  );
  info!(
    releases_loaded = store.len(),
    rejected = report.rejected,
    replaced = report.replaced,
    "Database loaded"
  );

  Ok(LoadedStore { store, report })
}

/// Serialize releases back into the document shape `load_from_bytes` reads.
pub fn encode_releases(releases: &[Arc<Release>]) -> Result<Vec<u8>> {
  let document = ReleaseDocument {
    releases: releases.iter().map(|r| r.as_ref()).collect(),
  };
  serde_json::to_vec_pretty(&document).map_err(Error::malformed)
}
