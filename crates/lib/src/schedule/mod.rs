//! Parallel build scheduling.
//!
//! This module turns a project/platform tree into build jobs and runs them
//! concurrently. It handles:
//! - Host filtering of platforms (`on`)
//! - A fixed-capacity concurrency gate
//! - Publishing each result as soon as its job finishes
//! - Converting task panics into failed results so no job is dropped

pub mod job;
pub mod types;

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Semaphore, mpsc};
use tokio::task::{Id, JoinError, JoinSet};
use tracing::{debug, error, info, warn};

use crate::config::Project;
use crate::toolchain::Toolchain;

pub use job::{BuildVars, Job, VarContext, run_job};
pub use types::{BuildResult, JobError, JobStage, RunSummary, ScheduleConfig, ScheduleError};

/// Runs build jobs with bounded concurrency.
///
/// Each scheduler owns its concurrency gate; independent schedulers do not
/// share slots.
pub struct Scheduler {
  toolchain: Arc<dyn Toolchain>,
  mode: Option<String>,
  parallelism: usize,
  gate: Arc<Semaphore>,
}

impl Scheduler {
  pub fn new(toolchain: Arc<dyn Toolchain>, config: ScheduleConfig) -> Self {
    let parallelism = config.effective_parallelism();
    Self {
      toolchain,
      mode: config.mode,
      parallelism,
      gate: Arc::new(Semaphore::new(parallelism)),
    }
  }

  /// The maximum number of jobs that run at once.
  pub fn parallelism(&self) -> usize {
    self.parallelism
  }

  /// Flatten `projects` into jobs, dropping platforms whose host filter does
  /// not match the current host.
  ///
  /// # Errors
  ///
  /// Returns [`ScheduleError::NoJobs`] if nothing is left to build.
  pub fn plan(&self, projects: &[Project]) -> Result<Vec<Job>, ScheduleError> {
    let host_os = &self.toolchain.env().host_os;
    let mut jobs = Vec::new();

    for project in projects {
      for platform in &project.platforms {
        if !platform.runs_on(host_os) {
          debug!(
            project = %project.display_name(),
            on = ?platform.on,
            host = %host_os,
            "skipping platform for other host"
          );
          continue;
        }
        jobs.push(Job::new(project, platform));
      }
    }

    if jobs.is_empty() {
      return Err(ScheduleError::NoJobs);
    }

    info!(jobs = jobs.len(), parallelism = self.parallelism, "planned build jobs");
    Ok(jobs)
  }

  /// Run every job, sending each result to `results` as soon as it is ready.
  ///
  /// Returns only after every job has finished and its result was sent. The
  /// sender is dropped on return, which ends the receiver's drain loop.
  pub async fn run(&self, jobs: Vec<Job>, results: mpsc::Sender<BuildResult>) -> RunSummary {
    let mut join_set = JoinSet::new();
    let mut launched: HashMap<Id, (String, String, String)> = HashMap::new();

    for job in jobs {
      let env = self.toolchain.env();
      let target = job.target(env);
      let package = job.raw_package();

      let toolchain = self.toolchain.clone();
      let gate = self.gate.clone();
      let mode = self.mode.clone();
      let results = results.clone();

      let handle = join_set.spawn(async move {
        // Acquire the slot inside the task; the gate is never closed
        let permit = gate.acquire_owned().await.ok();

        let result = run_job(&job, toolchain.as_ref(), mode.as_deref()).await;
        let success = result.is_success();
        drop(permit);
        publish(&results, result).await;
        success
      });

      launched.insert(handle.id(), (package, target.os, target.arch));
    }

    let mut summary = RunSummary::default();

    while let Some(joined) = join_set.join_next_with_id().await {
      match joined {
        Ok((id, success)) => {
          launched.remove(&id);
          summary.total += 1;
          if !success {
            summary.failed += 1;
          }
        }
        Err(e) => {
          let (package, os, arch) = launched.remove(&e.id()).unwrap_or_default();
          error!(package = %package, os = %os, arch = %arch, error = %e, "build task panicked");

          let result = BuildResult {
            package,
            os,
            arch,
            error: Some(JobError::Panicked(panic_message(e))),
            output: String::new(),
            elapsed: Default::default(),
          };
          summary.record(&result);
          publish(&results, result).await;
        }
      }
    }

    info!(total = summary.total, failed = summary.failed, "build jobs complete");
    summary
  }

  /// Plan and run `projects`, collecting every result.
  ///
  /// Results are in completion order.
  pub async fn collect(&self, projects: &[Project]) -> Result<(Vec<BuildResult>, RunSummary), ScheduleError> {
    let jobs = self.plan(projects)?;
    let (tx, mut rx) = mpsc::channel(jobs.len());

    let drain = async move {
      let mut collected = Vec::new();
      while let Some(result) = rx.recv().await {
        collected.push(result);
      }
      collected
    };

    let (summary, collected) = tokio::join!(self.run(jobs, tx), drain);
    Ok((collected, summary))
  }
}

async fn publish(results: &mpsc::Sender<BuildResult>, result: BuildResult) {
  if let Err(e) = results.send(result).await {
    warn!(result = %e.0, "result receiver dropped, discarding result");
  }
}

fn panic_message(e: JoinError) -> String {
  if !e.is_panic() {
    return e.to_string();
  }
  let payload = e.into_panic();
  if let Some(message) = payload.downcast_ref::<&str>() {
    message.to_string()
  } else if let Some(message) = payload.downcast_ref::<String>() {
    message.clone()
  } else {
    "unknown panic".to_string()
  }
}
