//! Configuration system for the release channel service.
//!
//! Config priority: explicit path > working directory (releasechan.toml) > user (~/.config/releasechan/config.toml)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};

/// File name looked up in the working directory
pub const LOCAL_CONFIG_FILE: &str = "releasechan.toml";

// ============================================================================
// Data Configuration
// ============================================================================

/// Backing data file configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
  /// Path to the JSON release document (default: db/db.json)
  pub file: PathBuf,
}

impl Default for DataConfig {
  fn default() -> Self {
    Self {
      file: PathBuf::from("db/db.json"),
    }
  }
}

// ============================================================================
// Reload Configuration
// ============================================================================

/// Live-reload configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReloadConfig {
  /// Run the timer-driven reload loop (default: true)
  /// On-demand reloads work regardless.
  pub enabled: bool,

  /// Seconds between modification-time checks (default: 30)
  pub interval_secs: u64,
}

impl Default for ReloadConfig {
  fn default() -> Self {
    Self {
      enabled: true,
      interval_secs: 30,
    }
  }
}

impl ReloadConfig {
  /// Interval between checks, never shorter than one second
  pub fn interval(&self) -> Duration {
    Duration::from_secs(self.interval_secs.max(1))
  }
}

// ============================================================================
// Daemon Configuration
// ============================================================================

/// Daemon logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
  /// Log level: "off", "error", "warn", "info", "debug", "trace"
  /// Default: "info"
  #[serde(default = "default_log_level")]
  pub log_level: String,

  /// Log file rotation: "daily", "hourly", "never"
  /// Default: "daily"
  #[serde(default = "default_log_rotation")]
  pub log_rotation: String,
}

fn default_log_level() -> String {
  "info".to_string()
}
fn default_log_rotation() -> String {
  "daily".to_string()
}

impl Default for DaemonConfig {
  fn default() -> Self {
    Self {
      log_level: default_log_level(),
      log_rotation: default_log_rotation(),
    }
  }
}

// ============================================================================
// Root Configuration
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
  pub data: DataConfig,
  pub reload: ReloadConfig,
  pub daemon: DaemonConfig,
}

impl Config {
  /// Load config from an explicit path. Unlike discovery, a missing or invalid file is an error.
  pub fn load_from(path: &Path) -> Result<Self> {
    let content = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    toml::from_str(&content).map_err(|e| Error::Config {
      path: path.to_path_buf(),
      message: e.to_string(),
    })
  }

  /// Load config for a working directory, with fallback to user config and then defaults
  pub fn load_for_dir(dir: &Path) -> Self {
    let local_config = Self::local_config_path(dir);
    if local_config.exists()
      && let Ok(content) = std::fs::read_to_string(&local_config)
      && let Ok(config) = toml::from_str(&content)
    {
      return config;
    }

    if let Some(user_config_path) = Self::user_config_path()
      && user_config_path.exists()
      && let Ok(content) = std::fs::read_to_string(&user_config_path)
      && let Ok(config) = toml::from_str(&content)
    {
      return config;
    }

    Self::default()
  }

  /// Resolve the effective config: explicit path if given, discovery otherwise
  pub fn resolve(explicit: Option<&Path>, dir: &Path) -> Result<Self> {
    match explicit {
      Some(path) => Self::load_from(path),
      None => Ok(Self::load_for_dir(dir)),
    }
  }

  /// Get the user-level config path
  pub fn user_config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("CONFIG_DIR") {
      return Some(PathBuf::from(path).join("config.toml"));
    }

    if let Ok(path) = std::env::var("XDG_CONFIG_HOME") {
      return Some(PathBuf::from(path).join("releasechan").join("config.toml"));
    }

    dirs::config_dir().map(|p: PathBuf| p.join("releasechan").join("config.toml"))
  }

  /// Get the working-directory config path
  pub fn local_config_path(dir: &Path) -> PathBuf {
    dir.join(LOCAL_CONFIG_FILE)
  }

  /// Generate a default config file as a string
  pub fn generate_template() -> String {
    r#"# Release channel service configuration
# Place in ./releasechan.toml or ~/.config/releasechan/config.toml (user)

# ============================================================================
# Data
# ============================================================================

[data]
# JSON document of the form {"releases": [{"container", "releaseChannel", "imagePath"}]}
file = "db/db.json"

# ============================================================================
# Live Reload
# ============================================================================

[reload]
# Periodically check the data file's modification time and reload on change.
# Manual reloads are always available.
enabled = true

# Seconds between checks (default: 30)
interval_secs = 30

# ============================================================================
# Daemon
# ============================================================================

[daemon]
# Log level: off, error, warn, info, debug, trace
log_level = "info"

# Log file rotation when running in the background: daily, hourly, never
log_rotation = "daily"
"#
    .to_string()
  }
}
