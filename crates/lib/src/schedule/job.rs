//! A single (project, platform) build job.
//!
//! A job resolves its package, builds its variable context, runs the `before`
//! actions, invokes the toolchain, and on success runs the `after` actions.
//! Any failure ends the job; other jobs are unaffected.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::{DateTime, Local};
use tracing::{debug, error, info};

use crate::action::Executor;
use crate::config::{Phase, Platform, Project};
use crate::expand::{Variables, expand};
use crate::toolchain::{PackageIdentity, Target, Toolchain, ToolchainEnv};

use super::types::{BuildResult, JobError, JobLabel, JobStage};

/// Format of the `BUILDTIME` variable.
pub const BUILD_TIME_FORMAT: &str = "%Y%m%d%H%M%S";

/// One scheduled build unit.
#[derive(Debug, Clone)]
pub struct Job {
  /// Project path as written in the config.
  pub path: String,
  /// Resolved absolute project directory.
  pub dir: PathBuf,
  pub platform: Platform,
}

impl Job {
  pub fn new(project: &Project, platform: &Platform) -> Self {
    Self {
      path: project.path.clone(),
      dir: project.full_path().to_path_buf(),
      platform: platform.clone(),
    }
  }

  /// The concrete target, filling empty os/arch from the host.
  pub fn target(&self, env: &ToolchainEnv) -> Target {
    let os = if self.platform.os.is_empty() {
      &env.host_os
    } else {
      &self.platform.os
    };
    let arch = if self.platform.arch.is_empty() {
      &env.host_arch
    } else {
      &self.platform.arch
    };
    Target::new(os.as_str(), arch.as_str())
  }

  /// Name reported for a job whose package could not be resolved.
  pub(crate) fn raw_package(&self) -> String {
    if self.path.is_empty() {
      self.dir.display().to_string()
    } else {
      self.path.clone()
    }
  }
}

/// The known per-job variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildVars {
  pub gopath: String,
  pub os: String,
  pub arch: String,
  pub pkg_dir: String,
  pub pkg_name: String,
  pub output_dir: String,
  pub output_name: String,
  pub build_time: String,
  output: PathBuf,
}

impl BuildVars {
  /// Derive the variables for building `project_dir` for `target`.
  ///
  /// The output template sees `GOPATH`, `GOOS`, `GOARCH`, `PKGDIR`, and
  /// `PKGNAME`; the output directory and name come from its expansion.
  pub fn new(
    env: &ToolchainEnv,
    target: &Target,
    project_dir: &Path,
    output_template: &str,
    now: DateTime<Local>,
  ) -> Self {
    let mut vars = Self {
      gopath: env.path.display().to_string(),
      os: target.os.clone(),
      arch: target.arch.clone(),
      pkg_dir: project_dir
        .parent()
        .map(|p| p.display().to_string())
        .unwrap_or_default(),
      pkg_name: project_dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default(),
      output_dir: String::new(),
      output_name: String::new(),
      build_time: String::new(),
      output: PathBuf::new(),
    };

    let output = PathBuf::from(expand(output_template, &vars.to_context()));
    vars.output_dir = output.parent().map(|p| p.display().to_string()).unwrap_or_default();
    vars.output_name = output
      .file_name()
      .map(|n| n.to_string_lossy().into_owned())
      .unwrap_or_default();
    vars.output = output;
    vars.build_time = now.format(BUILD_TIME_FORMAT).to_string();
    vars
  }

  /// The expanded output path.
  pub fn output(&self) -> &Path {
    &self.output
  }

  /// The mapping handed to the expander. Unset derived values are omitted.
  pub fn to_context(&self) -> VarContext {
    let entries = [
      ("GOPATH", &self.gopath),
      ("GOOS", &self.os),
      ("GOARCH", &self.arch),
      ("PKGDIR", &self.pkg_dir),
      ("PKGNAME", &self.pkg_name),
      ("OUTPUTDIR", &self.output_dir),
      ("OUTPUTNAME", &self.output_name),
      ("BUILDTIME", &self.build_time),
    ];

    VarContext(
      entries
        .into_iter()
        .filter(|(_, value)| !value.is_empty())
        .map(|(key, value)| (key.to_string(), value.clone()))
        .collect(),
    )
  }
}

/// An immutable variable mapping owned by one job.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VarContext(BTreeMap<String, String>);

impl VarContext {
  pub fn get(&self, name: &str) -> Option<&str> {
    self.0.get(name).map(String::as_str)
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }
}

impl Variables for VarContext {
  fn lookup(&self, name: &str) -> Option<&str> {
    self.get(name)
  }
}

/// Run `job` to completion.
///
/// Never fails: every outcome, including package resolution failure, is
/// recorded in the returned [`BuildResult`].
pub async fn run_job(job: &Job, toolchain: &dyn Toolchain, mode: Option<&str>) -> BuildResult {
  let started = Instant::now();
  let target = job.target(toolchain.env());
  let label = JobLabel {
    path: job.dir.clone(),
    os: target.os.clone(),
    arch: target.arch.clone(),
  };
  debug!(job = %label, stage = %JobStage::Pending, "job started");

  let mut result = BuildResult {
    package: job.raw_package(),
    os: target.os.clone(),
    arch: target.arch.clone(),
    error: None,
    output: String::new(),
    elapsed: Default::default(),
  };

  let (output, error) = match toolchain.resolve_package(&job.dir).await {
    Ok(pkg) => {
      result.package = pkg.import_path.clone();

      let vars = BuildVars::new(toolchain.env(), &target, &job.dir, &job.platform.output, Local::now());
      let context = vars.to_context();
      let executor = Executor::new(&job.dir, &context, mode);

      run_phases(&executor, job, toolchain, &pkg, &target, vars.output(), &label).await
    }
    Err(e) => {
      let log = e.output().unwrap_or_default().to_string();
      (log, Some(JobError::Resolve(e)))
    }
  };

  result.output = output;
  result.error = error;
  result.elapsed = started.elapsed();

  debug!(job = %label, stage = %JobStage::Done, "job finished");
  match &result.error {
    None => info!(package = %result.package, os = %result.os, arch = %result.arch, "build succeeded"),
    Some(e) => error!(package = %result.package, os = %result.os, arch = %result.arch, error = %e, "build failed"),
  }

  result
}

/// The before, build, and after steps. Returns the build log and the first error.
async fn run_phases(
  executor: &Executor<'_, VarContext>,
  job: &Job,
  toolchain: &dyn Toolchain,
  pkg: &PackageIdentity,
  target: &Target,
  output: &Path,
  label: &JobLabel,
) -> (String, Option<JobError>) {
  let actions = &job.platform.actions;

  debug!(job = %label, stage = %JobStage::Before, "running before actions");
  if let Err(e) = executor.run_phase(actions, Phase::Before).await {
    return (String::new(), Some(e.into()));
  }

  debug!(job = %label, stage = %JobStage::Building, output = ?output, "building");
  let log = match toolchain.build(pkg, target, output).await {
    Ok(log) => log,
    Err(e) => {
      let log = e.output().unwrap_or_default().to_string();
      return (log, Some(JobError::Build(e)));
    }
  };

  debug!(job = %label, stage = %JobStage::After, "running after actions");
  match executor.run_phase(actions, Phase::After).await {
    Ok(_) => (log, None),
    Err(e) => (log, Some(e.into())),
  }
}
