pub mod config;
pub mod error;
pub mod release;
pub mod validation;

pub use config::{Config, DaemonConfig, DataConfig, ReloadConfig};
pub use error::{Error, Result};
pub use release::{QueryShape, Release, ReleaseKey, ReleaseQuery};
pub use validation::{ValidationError, ValidationResult, require_non_empty};
