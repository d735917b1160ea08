mod catalog;
mod loader;
mod reload;
mod service;
mod store;

pub mod dirs;

mod daemon;
pub use daemon::{Daemon, RunningDaemon, RuntimeConfig};

pub use catalog::{Catalog, Generation};
pub use loader::{LoadReport, LoadedStore, encode_releases, load_from_bytes};
pub use reload::{ReloadOutcome, ReloadState, ReloadStatus, Reloader};
pub use service::{Health, QueryResult, ReleaseService};
pub use store::{ReleaseStore, WriteOutcome};

pub use releasechan_core::{Config, Error, Release, ReleaseKey, ReleaseQuery, Result};

#[cfg(test)]
mod __tests__;
