//! Reload supervisor tests: change detection, failure isolation, and the timer loop.

#[cfg(test)]
mod tests {
  use std::{
    sync::Arc,
    time::{Duration, UNIX_EPOCH},
  };

  use pretty_assertions::assert_eq;
  use releasechan_core::{Error, ReleaseQuery};
  use tokio_util::sync::CancellationToken;

  use crate::{
    __tests__::helpers::{BASE_MTIME, ReloadTestContext, wait_for},
    loader::load_from_bytes,
    reload::{ReloadOutcome, ReloadState, Reloader},
  };

  fn images(reloader: &Reloader, query: &ReleaseQuery) -> Vec<String> {
    reloader
      .catalog()
      .query(query)
      .iter()
      .map(|r| r.image_path.clone())
      .collect()
  }

  // ==========================================================================
  // Bootstrap
  // ==========================================================================

  #[tokio::test]
  async fn test_bootstrap_loads_initial_generation() {
    let ctx = ReloadTestContext::new();
    ctx.write_releases(&[("app", "dev", "img:dev"), ("app", "prod", "img:prod")], 0);

    let reloader = ctx.reloader().await;

    assert_eq!(reloader.catalog().generation(), 1);
    assert_eq!(
      images(&reloader, &ReleaseQuery::by_container("app")),
      vec!["img:dev", "img:prod"]
    );
    assert_eq!(reloader.status().state, ReloadState::Idle);
    assert!(reloader.status().source_modified.is_some());
  }

  #[tokio::test]
  async fn test_bootstrap_fails_fast_on_malformed_file() {
    let ctx = ReloadTestContext::new();
    ctx.write_raw(b"{\"releases\": [", 0);

    let err = Reloader::bootstrap(&ctx.path).await.err().expect("bootstrap should fail");
    assert!(matches!(err, Error::MalformedInput { .. }));
  }

  #[tokio::test]
  async fn test_bootstrap_fails_fast_on_missing_file() {
    let ctx = ReloadTestContext::new();

    let err = Reloader::bootstrap(&ctx.path).await.err().expect("bootstrap should fail");
    match err {
      Error::Io { path, .. } => assert_eq!(path, ctx.path),
      other => panic!("expected Io error, got {:?}", other),
    }
  }

  // ==========================================================================
  // Change Detection
  // ==========================================================================

  /// A rewritten file with an unchanged mtime is not picked up.
  #[tokio::test]
  async fn test_unchanged_mtime_skips_rebuild() {
    let ctx = ReloadTestContext::new();
    ctx.write_releases(&[("app", "dev", "img:dev")], 0);
    let reloader = ctx.reloader().await;

    ctx.write_releases(&[("app", "dev", "img:dev"), ("sentinel", "dev", "sentinel:1")], 0);

    let outcome = reloader.reload().await.expect("reload");
    assert_eq!(outcome, ReloadOutcome::Unchanged);
    assert_eq!(reloader.catalog().generation(), 1);
    assert!(images(&reloader, &ReleaseQuery::by_container("sentinel")).is_empty());
  }

  #[tokio::test]
  async fn test_older_mtime_skips_rebuild() {
    let ctx = ReloadTestContext::new();
    ctx.write_releases(&[("app", "dev", "img:dev")], 0);
    let reloader = ctx.reloader().await;

    ctx.write_releases(&[("app", "dev", "img:old")], -60);

    assert_eq!(reloader.reload().await.expect("reload"), ReloadOutcome::Unchanged);
    assert_eq!(images(&reloader, &ReleaseQuery::all()), vec!["img:dev"]);
  }

  #[tokio::test]
  async fn test_newer_mtime_publishes_new_generation() {
    let ctx = ReloadTestContext::new();
    ctx.write_releases(&[("app", "dev", "img:1")], 0);
    let reloader = ctx.reloader().await;
    let held = reloader.catalog().snapshot();

    ctx.write_releases(&[("app", "dev", "img:2"), ("sentinel", "dev", "sentinel:1")], 10);

    match reloader.reload().await.expect("reload") {
      ReloadOutcome::Reloaded {
        generation,
        releases,
        report,
      } => {
        assert_eq!(generation, 2);
        assert_eq!(releases, 2);
        assert_eq!(report.accepted, 2);
        assert_eq!(report.rejected, 0);
      }
      other => panic!("expected Reloaded, got {:?}", other),
    }

    assert_eq!(images(&reloader, &ReleaseQuery::by_container("sentinel")), vec!["sentinel:1"]);
    assert_eq!(images(&reloader, &ReleaseQuery::exact("app", "dev")), vec!["img:2"]);

    // A query holding the old generation still sees it whole
    assert_eq!(held.number, 1);
    assert_eq!(held.store.len(), 1);

    // Same mtime again is a no-op
    assert_eq!(reloader.reload().await.expect("reload"), ReloadOutcome::Unchanged);

    let status = reloader.status();
    assert_eq!(status.checks, 2);
    assert_eq!(status.reloads, 1);
    assert_eq!(status.failures, 0);
    assert!(status.last_reload_at.is_some());
  }

  #[tokio::test]
  async fn test_partial_records_still_reload() {
    let ctx = ReloadTestContext::new();
    ctx.write_releases(&[("app", "dev", "img:1")], 0);
    let reloader = ctx.reloader().await;

    ctx.write_raw(
      br#"{"releases": [
        {"container": "app", "releaseChannel": "dev", "imagePath": "img:2"},
        {"container": "app", "releaseChannel": "prod"},
        {"container": "web", "releaseChannel": "prod", "imagePath": "web:1"}
      ]}"#,
      5,
    );

    match reloader.reload().await.expect("reload") {
      ReloadOutcome::Reloaded { releases, report, .. } => {
        assert_eq!(releases, 2);
        assert_eq!(report.rejected, 1);
      }
      other => panic!("expected Reloaded, got {:?}", other),
    }
  }

  /// A rebuild of a file older than the published data is discarded.
  #[tokio::test]
  async fn test_rebuild_of_older_file_is_superseded() {
    let ctx = ReloadTestContext::new();
    ctx.write_releases(&[("app", "dev", "img:1")], 0);
    let reloader = ctx.reloader().await;

    // Newer data published by another cycle, read from a file at +20s
    let newer = load_from_bytes(br#"{"releases": [{"container": "app", "releaseChannel": "dev", "imagePath": "img:3"}]}"#)
      .expect("load newer");
    let newer_mtime = UNIX_EPOCH + Duration::from_secs((BASE_MTIME + 20) as u64);
    assert!(reloader.catalog().publish_if_newer(newer, newer_mtime).is_some());

    // The file on disk is past the watermark but older than the published data
    ctx.write_releases(&[("app", "dev", "img:2")], 10);

    assert_eq!(reloader.reload().await.expect("reload"), ReloadOutcome::Superseded);
    assert_eq!(reloader.catalog().generation(), 2);
    assert_eq!(images(&reloader, &ReleaseQuery::all()), vec!["img:3"]);

    // The discarded file is not rebuilt again
    assert_eq!(reloader.reload().await.expect("reload"), ReloadOutcome::Unchanged);
    assert_eq!(reloader.status().reloads, 0);
    assert_eq!(reloader.status().state, ReloadState::Idle);
  }

  // ==========================================================================
  // Failure Isolation
  // ==========================================================================

  #[tokio::test]
  async fn test_malformed_update_keeps_previous_generation() {
    let ctx = ReloadTestContext::new();
    ctx.write_releases(&[("app", "dev", "img:1")], 0);
    let reloader = ctx.reloader().await;

    ctx.write_raw(b"this is not json", 10);

    let err = reloader.reload().await.expect_err("malformed file should fail");
    assert!(matches!(err, Error::MalformedInput { .. }));
    assert_eq!(reloader.catalog().generation(), 1);
    assert_eq!(images(&reloader, &ReleaseQuery::all()), vec!["img:1"]);

    let status = reloader.status();
    assert_eq!(status.failures, 1);
    assert!(status.last_error.is_some());
    assert_eq!(status.state, ReloadState::Idle);

    // The watermark did not advance, so fixing the file with the same mtime is picked up
    ctx.write_releases(&[("app", "dev", "img:fixed")], 10);
    assert!(matches!(
      reloader.reload().await.expect("reload"),
      ReloadOutcome::Reloaded { generation: 2, .. }
    ));
    assert_eq!(images(&reloader, &ReleaseQuery::all()), vec!["img:fixed"]);
    assert!(reloader.status().last_error.is_none());
  }

  #[tokio::test]
  async fn test_missing_file_keeps_previous_generation() {
    let ctx = ReloadTestContext::new();
    ctx.write_releases(&[("app", "dev", "img:1")], 0);
    let reloader = ctx.reloader().await;

    std::fs::remove_file(&ctx.path).expect("remove file");

    let err = reloader.reload().await.expect_err("missing file should fail");
    assert!(matches!(err, Error::Io { .. }));
    assert_eq!(images(&reloader, &ReleaseQuery::all()), vec!["img:1"]);
  }

  // ==========================================================================
  // Concurrency
  // ==========================================================================

  #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
  async fn test_overlapping_reloads_converge() {
    let ctx = ReloadTestContext::new();
    ctx.write_releases(&[("app", "dev", "img:1")], 0);
    let reloader = ctx.reloader().await;

    ctx.write_releases(&[("app", "dev", "img:2"), ("app", "prod", "img:2")], 30);

    let tasks: Vec<_> = (0..8)
      .map(|_| {
        let reloader = Arc::clone(&reloader);
        tokio::spawn(async move { reloader.reload().await })
      })
      .collect();

    let mut reloaded = 0;
    for task in tasks {
      let outcome = task.await.expect("join").expect("reload");
      if matches!(outcome, ReloadOutcome::Reloaded { .. }) {
        reloaded += 1;
      }
    }

    assert!(reloaded >= 1);
    assert_eq!(images(&reloader, &ReleaseQuery::by_container("app")), vec!["img:2", "img:2"]);
    assert_eq!(reloader.status().state, ReloadState::Idle);
  }

  // ==========================================================================
  // Timer Loop
  // ==========================================================================

  #[tokio::test]
  async fn test_run_loop_picks_up_changes_and_stops_on_cancel() {
    let ctx = ReloadTestContext::new();
    ctx.write_releases(&[("app", "dev", "img:1")], 0);
    let reloader = ctx.reloader().await;

    let cancel = CancellationToken::new();
    let task = {
      let reloader = Arc::clone(&reloader);
      let cancel = cancel.clone();
      tokio::spawn(async move { reloader.run(Duration::from_millis(50), cancel).await })
    };

    ctx.write_releases(&[("app", "dev", "img:2")], 10);

    let picked_up = wait_for(Duration::from_secs(5), || reloader.catalog().generation() == 2).await;
    assert!(picked_up, "timer loop should publish the new generation");
    assert_eq!(images(&reloader, &ReleaseQuery::all()), vec!["img:2"]);

    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(2), task)
      .await
      .expect("run loop should stop after cancel")
      .expect("join");
    assert_eq!(reloader.status().state, ReloadState::Idle);
  }

  #[tokio::test]
  async fn test_run_loop_survives_bad_updates() {
    let ctx = ReloadTestContext::new();
    ctx.write_releases(&[("app", "dev", "img:1")], 0);
    let reloader = ctx.reloader().await;

    let cancel = CancellationToken::new();
    let task = {
      let reloader = Arc::clone(&reloader);
      let cancel = cancel.clone();
      tokio::spawn(async move { reloader.run(Duration::from_millis(50), cancel).await })
    };

    ctx.write_raw(b"[broken", 10);
    let failed = wait_for(Duration::from_secs(5), || reloader.status().failures > 0).await;
    assert!(failed, "timer loop should attempt the broken file");
    assert_eq!(images(&reloader, &ReleaseQuery::all()), vec!["img:1"]);

    ctx.write_releases(&[("app", "dev", "img:3")], 20);
    let recovered = wait_for(Duration::from_secs(5), || reloader.catalog().generation() == 2).await;
    assert!(recovered, "timer loop should keep running after a failure");
    assert_eq!(images(&reloader, &ReleaseQuery::all()), vec!["img:3"]);

    cancel.cancel();
    let _ = tokio::time::timeout(Duration::from_secs(2), task).await;
  }
}
