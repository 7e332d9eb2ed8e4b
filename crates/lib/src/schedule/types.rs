//! Types for build scheduling.
//!
//! This module defines the per-job result record, the error types, and the
//! scheduler configuration.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::Semaphore;

use crate::action::PhaseError;
use crate::toolchain::ToolchainError;

/// Errors that abort a run before any job starts.
#[derive(Debug, Error)]
pub enum ScheduleError {
  /// Every configured platform was excluded by its host filter.
  #[error("no build job found")]
  NoJobs,
}

/// Why a single job failed.
#[derive(Debug, Error)]
pub enum JobError {
  /// The project path holds no buildable main package.
  #[error("failed to resolve package: {0}")]
  Resolve(#[source] ToolchainError),

  /// A before or after action failed.
  #[error(transparent)]
  Action(#[from] PhaseError),

  /// The compiler invocation failed.
  #[error("build failed: {0}")]
  Build(#[source] ToolchainError),

  /// The job task panicked before producing a result.
  #[error("job panicked: {0}")]
  Panicked(String),
}

/// Outcome of one (project, platform) job.
#[derive(Debug)]
pub struct BuildResult {
  /// Resolved import path, or the raw project path when resolution failed.
  pub package: String,
  pub os: String,
  pub arch: String,
  pub error: Option<JobError>,
  /// Combined compiler output.
  pub output: String,
  /// Wall-clock time the job ran for, excluding time spent waiting for a slot.
  pub elapsed: Duration,
}

impl BuildResult {
  pub fn is_success(&self) -> bool {
    self.error.is_none()
  }

  /// The `os/arch` pair this result was built for.
  pub fn platform(&self) -> String {
    format!("{}/{}", self.os, self.arch)
  }
}

impl fmt::Display for BuildResult {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}({}/{})", self.package, self.os, self.arch)
  }
}

/// Aggregate outcome of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
  pub total: usize,
  pub failed: usize,
}

impl RunSummary {
  pub fn is_success(&self) -> bool {
    self.failed == 0
  }

  pub fn succeeded(&self) -> usize {
    self.total - self.failed
  }

  pub(crate) fn record(&mut self, result: &BuildResult) {
    self.total += 1;
    if !result.is_success() {
      self.failed += 1;
    }
  }
}

/// Configuration for a [`super::Scheduler`].
#[derive(Debug, Clone)]
pub struct ScheduleConfig {
  /// Maximum number of jobs running at once. Zero means the host CPU count.
  pub parallelism: usize,

  /// Active build mode, compared against each action's `mode`.
  pub mode: Option<String>,
}

impl ScheduleConfig {
  /// The effective concurrency limit, capped at what a semaphore can hold.
  pub fn effective_parallelism(&self) -> usize {
    if self.parallelism == 0 {
      num_cpus()
    } else {
      self.parallelism.min(Semaphore::MAX_PERMITS)
    }
  }
}

impl Default for ScheduleConfig {
  fn default() -> Self {
    Self {
      parallelism: num_cpus(),
      mode: None,
    }
  }
}

/// Get the number of CPUs for default parallelism.
pub fn num_cpus() -> usize {
  std::thread::available_parallelism().map(|p| p.get()).unwrap_or(4)
}

/// Where a job is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStage {
  Pending,
  Before,
  Building,
  After,
  Done,
}

impl JobStage {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Pending => "pending",
      Self::Before => "before",
      Self::Building => "building",
      Self::After => "after",
      Self::Done => "done",
    }
  }
}

impl fmt::Display for JobStage {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

/// Identifies a job in logs before its package is resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobLabel {
  pub path: PathBuf,
  pub os: String,
  pub arch: String,
}

impl fmt::Display for JobLabel {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}({}/{})", self.path.display(), self.os, self.arch)
  }
}
