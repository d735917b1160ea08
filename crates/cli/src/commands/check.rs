//! Check command

use anyhow::{Context, Result};
use releasechan::load_from_bytes;
use releasechan_core::Config;
use std::path::PathBuf;

/// Parse a release document and summarize what a load would keep
pub async fn cmd_check(config: &Config, file: Option<PathBuf>) -> Result<()> {
  let path = file.unwrap_or_else(|| config.data.file.clone());
  let data = tokio::fs::read(&path)
    .await
    .with_context(|| format!("Failed to read {}", path.display()))?;
  let loaded = load_from_bytes(&data).with_context(|| format!("Invalid release document {}", path.display()))?;

  let report = loaded.report;
  println!("File:       {}", path.display());
  println!("Releases:   {}", loaded.store.len());
  println!("Containers: {}", loaded.store.containers().len());
  println!("Channels:   {}", loaded.store.channels().join(", "));
  println!("Accepted:   {}", report.accepted);
  println!("Replaced:   {}", report.replaced);
  println!("Rejected:   {}", report.rejected);

  if report.rejected > 0 {
    println!();
    println!("Rejected records were skipped; run with RUST_LOG=warn to see why.");
  }

  Ok(())
}
