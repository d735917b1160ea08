//! Config commands

use anyhow::{Context, Result, bail};
use releasechan_core::Config;
use std::path::Path;

/// Show the effective configuration and where it came from
pub fn cmd_config_show(config: &Config, explicit: Option<&Path>, cwd: &Path) -> Result<()> {
  let local_config = Config::local_config_path(cwd);
  let user_config = Config::user_config_path();

  if let Some(path) = explicit {
    println!("Using config: {:?}", path);
  } else if local_config.exists() {
    println!("Using local config: {:?}", local_config);
  } else if let Some(user_path) = user_config.filter(|p| p.exists()) {
    println!("Using user config: {:?}", user_path);
  } else {
    println!("Using default configuration (no config file found)");
  }
  println!();

  let toml_str = toml::to_string_pretty(config)?;
  println!("{}", toml_str);

  Ok(())
}

/// Write a commented config template to the current directory
pub fn cmd_config_init(cwd: &Path, force: bool) -> Result<()> {
  let config_path = Config::local_config_path(cwd);

  if config_path.exists() && !force {
    bail!("Config file already exists: {:?} (use --force to overwrite)", config_path);
  }

  std::fs::write(&config_path, Config::generate_template())
    .with_context(|| format!("Failed to write {}", config_path.display()))?;

  println!("Created config: {:?}", config_path);
  println!("Edit the file to customize settings.");

  Ok(())
}
