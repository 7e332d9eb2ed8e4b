//! Implementation of the default build command.
//!
//! Loads the build config for a target, schedules one job per
//! (project, platform) pair, and reports each result as it arrives.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tracing::info;

use gobuild_lib::config;
use gobuild_lib::schedule::{BuildResult, ScheduleConfig, Scheduler};
use gobuild_lib::toolchain::{GoToolchain, Toolchain};

use crate::output::{print_info, print_result, print_summary, print_warning};

/// Options for a build run.
pub struct BuildOptions {
  /// Directory, config file, or Go import path.
  pub target: String,
  /// Maximum concurrent jobs; zero means the CPU count.
  pub parallel: usize,
  pub mode: Option<String>,
  pub verbose: bool,
}

/// Execute the build command.
///
/// Returns whether every job succeeded.
pub fn cmd_build(options: BuildOptions) -> Result<bool> {
  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  rt.block_on(build(options))
}

async fn build(options: BuildOptions) -> Result<bool> {
  let toolchain = GoToolchain::discover_environment()
    .await
    .context("initialize failed")?;
  let cwd = std::env::current_dir().context("Failed to determine current directory")?;

  let loaded = config::load(&options.target, &cwd, &toolchain.env().path)?;
  if loaded.defaulted {
    print_warning(&format!(
      "{} not found, using default config",
      loaded.path.display()
    ));
  }

  let scheduler = Scheduler::new(
    Arc::new(toolchain),
    ScheduleConfig {
      parallelism: options.parallel,
      mode: options.mode,
    },
  );
  let jobs = scheduler.plan(&loaded.config.projects)?;

  print_info(&format!(
    "build {} job(s) with {} worker(s)...",
    jobs.len(),
    scheduler.parallelism()
  ));

  let (tx, rx) = mpsc::channel(jobs.len());
  let reporter = tokio::spawn(report(rx, options.verbose));

  let summary = scheduler.run(jobs, tx).await;
  let reported = reporter.await.context("Result reporter failed")?;
  info!(reported, total = summary.total, "all results reported");

  print_summary(&summary);
  Ok(summary.is_success())
}

/// Print results until the scheduler closes the channel.
async fn report(mut results: mpsc::Receiver<BuildResult>, verbose: bool) -> usize {
  let mut count = 0;
  while let Some(result) = results.recv().await {
    print_result(&result, verbose);
    count += 1;
  }
  count
}
