//! Shared test helpers for library integration tests.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use gobuild_lib::config::{BuildConfig, Project};
use gobuild_lib::schedule::{BuildResult, RunSummary, ScheduleConfig, Scheduler};
use gobuild_lib::toolchain::{PackageIdentity, Target, Toolchain, ToolchainEnv, ToolchainError};
use tempfile::TempDir;

/// Name of the file that actions and builds append their markers to.
pub const ORDER_LOG: &str = "order.log";

/// Script that appends its first argument to the order log, failing when
/// the second argument is `fail`.
pub const RECORD_SCRIPT: &str = r#"#!/bin/sh
echo "$1" >> order.log
[ "$2" != "fail" ]
"#;

/// A toolchain that records builds instead of compiling.
///
/// Each build appends `build` to the package's order log and writes a
/// placeholder binary at the output path.
pub struct RecordingToolchain {
  env: ToolchainEnv,
  builds: Mutex<Vec<String>>,
}

impl RecordingToolchain {
  pub fn new(gopath: &Path) -> Self {
    Self {
      env: ToolchainEnv {
        version: "go1.22.3".to_string(),
        host_os: "linux".to_string(),
        host_arch: "amd64".to_string(),
        root: PathBuf::from("/usr/local/go"),
        path: gopath.to_path_buf(),
      },
      builds: Mutex::new(Vec::new()),
    }
  }

  /// Every build as `import_path os/arch`.
  pub fn builds(&self) -> Vec<String> {
    self.builds.lock().unwrap().clone()
  }
}

#[async_trait]
impl Toolchain for RecordingToolchain {
  fn env(&self) -> &ToolchainEnv {
    &self.env
  }

  async fn resolve_package(&self, dir: &Path) -> Result<PackageIdentity, ToolchainError> {
    if !dir.join("main.go").exists() {
      return Err(ToolchainError::NotMainPackage {
        dir: dir.to_path_buf(),
        name: String::new(),
      });
    }
    let name = dir.file_name().unwrap().to_string_lossy();
    Ok(PackageIdentity {
      import_path: format!("example.com/{name}"),
      dir: dir.to_path_buf(),
    })
  }

  async fn build(&self, pkg: &PackageIdentity, target: &Target, output: &Path) -> Result<String, ToolchainError> {
    use std::io::Write;

    let mut log = std::fs::OpenOptions::new()
      .create(true)
      .append(true)
      .open(pkg.dir.join(ORDER_LOG))
      .unwrap();
    writeln!(log, "build").unwrap();

    let output = if output.is_absolute() {
      output.to_path_buf()
    } else {
      pkg.dir.join(output)
    };
    std::fs::create_dir_all(output.parent().unwrap()).unwrap();
    std::fs::write(&output, format!("binary for {target}")).unwrap();

    self.builds.lock().unwrap().push(format!("{} {target}", pkg.import_path));
    Ok(format!("go build -o {}\n", output.display()))
  }
}

/// A scratch workspace holding a GOPATH and project directories.
pub struct Workspace {
  pub temp: TempDir,
}

impl Workspace {
  pub fn new() -> Self {
    Self {
      temp: TempDir::new().unwrap(),
    }
  }

  pub fn root(&self) -> &Path {
    self.temp.path()
  }

  pub fn gopath(&self) -> PathBuf {
    self.root().join("go")
  }

  /// Create a main package at `relative` with the record script beside it.
  pub fn main_package(&self, relative: &str) -> PathBuf {
    let dir = self.root().join(relative);
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("main.go"), "package main\n\nfunc main() {}\n").unwrap();
    std::fs::write(dir.join("record.sh"), RECORD_SCRIPT).unwrap();
    dir
  }

  /// Write a file relative to the workspace root.
  pub fn write_file(&self, relative: &str, content: &str) {
    let path = self.root().join(relative);
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, content).unwrap();
  }
}

/// Read the order log of a package directory as lines.
pub fn order(dir: &Path) -> Vec<String> {
  std::fs::read_to_string(dir.join(ORDER_LOG))
    .unwrap_or_default()
    .lines()
    .map(str::to_string)
    .collect()
}

/// Run `projects` through a fresh scheduler.
pub async fn run(
  toolchain: Arc<RecordingToolchain>,
  projects: &[Project],
  mode: Option<&str>,
) -> (Vec<BuildResult>, RunSummary) {
  let scheduler = Scheduler::new(
    toolchain,
    ScheduleConfig {
      parallelism: 2,
      mode: mode.map(str::to_string),
    },
  );
  scheduler.collect(projects).await.unwrap()
}

/// Parse a config document.
pub fn parse(toml: &str) -> BuildConfig {
  toml::from_str(toml).unwrap()
}
