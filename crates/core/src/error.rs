use std::path::PathBuf;

use thiserror::Error;

/// Failures that reject a whole load or configuration.
///
/// A single invalid record is not an `Error`: the loader reports it as a
/// [`crate::ValidationError`] and skips it.
#[derive(Error, Debug)]
pub enum Error {
  #[error("Malformed input: {source}")]
  MalformedInput {
    #[source]
    source: serde_json::Error,
  },

  #[error("IO: {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("Config: {path}: {message}")]
  Config { path: PathBuf, message: String },
}

impl Error {
  pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
    Self::Io {
      path: path.into(),
      source,
    }
  }

  pub fn malformed(source: serde_json::Error) -> Self {
    Self::MalformedInput { source }
  }
}

pub type Result<T> = std::result::Result<T, Error>;
