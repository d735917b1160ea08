//! Query command

use anyhow::{Context, Result};
use releasechan::{QueryResult, Reloader, ReleaseService};
use releasechan_core::{Config, Release, ReleaseQuery};
use std::{path::PathBuf, sync::Arc};

/// Load the release document once and print the matching releases
pub async fn cmd_query(
  config: &Config,
  file: Option<PathBuf>,
  container: Option<&str>,
  release_channel: Option<&str>,
  json: bool,
) -> Result<()> {
  let path = file.unwrap_or_else(|| config.data.file.clone());
  let reloader = Reloader::bootstrap(&path)
    .await
    .with_context(|| format!("Failed to load {}", path.display()))?;
  let service = ReleaseService::new(Arc::new(reloader));

  let query = ReleaseQuery::new(container, release_channel);
  let releases = match service.find(&query) {
    QueryResult::Found(releases) => releases,
    QueryResult::NotFound => {
      if json {
        println!("[]");
      } else {
        eprintln!("No releases found");
      }
      std::process::exit(1);
    }
  };

  if json {
    let releases: Vec<&Release> = releases.iter().map(|r| r.as_ref()).collect();
    println!("{}", serde_json::to_string_pretty(&releases)?);
    return Ok(());
  }

  let container_width = releases.iter().map(|r| r.container.len()).max().unwrap_or(0).max(9);
  let channel_width = releases
    .iter()
    .map(|r| r.release_channel.len())
    .max()
    .unwrap_or(0)
    .max(7);

  println!(
    "{:<cw$}  {:<chw$}  IMAGE",
    "CONTAINER",
    "CHANNEL",
    cw = container_width,
    chw = channel_width
  );
  for release in &releases {
    println!(
      "{:<cw$}  {:<chw$}  {}",
      release.container,
      release.release_channel,
      release.image_path,
      cw = container_width,
      chw = channel_width
    );
  }

  Ok(())
}
