//! Test utilities for gobuild-lib.
//!
//! Provides a scriptable in-process [`Toolchain`] so scheduler tests run
//! without a Go installation.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::toolchain::{PackageIdentity, Target, Toolchain, ToolchainEnv, ToolchainError};

/// Host environment reported by [`FakeToolchain`].
pub fn fake_env() -> ToolchainEnv {
  ToolchainEnv {
    version: "go1.22.3".to_string(),
    host_os: "linux".to_string(),
    host_arch: "amd64".to_string(),
    root: PathBuf::from("/usr/local/go"),
    path: PathBuf::from("/home/dev/go"),
  }
}

/// A toolchain whose builds sleep for a fixed time and track concurrency.
#[derive(Debug, Default)]
pub struct FakeToolchain {
  env: ToolchainEnv,
  delay: Duration,
  /// Directories that fail package resolution.
  unresolvable: HashSet<PathBuf>,
  /// Directories where listing the package fails outright.
  unlistable: HashSet<PathBuf>,
  /// Directories whose build panics.
  panicking: HashSet<PathBuf>,
  /// Directories whose build fails.
  failing: HashSet<PathBuf>,
  running: AtomicUsize,
  peak: AtomicUsize,
  builds: Mutex<Vec<(PathBuf, Target, PathBuf)>>,
}

impl FakeToolchain {
  pub fn new() -> Self {
    Self {
      env: fake_env(),
      ..Default::default()
    }
  }

  pub fn with_delay(mut self, delay: Duration) -> Self {
    self.delay = delay;
    self
  }

  pub fn unresolvable(mut self, dir: impl Into<PathBuf>) -> Self {
    self.unresolvable.insert(dir.into());
    self
  }

  pub fn unlistable(mut self, dir: impl Into<PathBuf>) -> Self {
    self.unlistable.insert(dir.into());
    self
  }

  pub fn panicking(mut self, dir: impl Into<PathBuf>) -> Self {
    self.panicking.insert(dir.into());
    self
  }

  pub fn failing(mut self, dir: impl Into<PathBuf>) -> Self {
    self.failing.insert(dir.into());
    self
  }

  /// Highest number of builds observed running at once.
  pub fn peak(&self) -> usize {
    self.peak.load(Ordering::SeqCst)
  }

  /// Every build invocation as (package dir, target, output).
  pub fn builds(&self) -> Vec<(PathBuf, Target, PathBuf)> {
    self.builds.lock().unwrap().clone()
  }
}

#[async_trait]
impl Toolchain for FakeToolchain {
  fn env(&self) -> &ToolchainEnv {
    &self.env
  }

  async fn resolve_package(&self, dir: &Path) -> Result<PackageIdentity, ToolchainError> {
    if self.unresolvable.contains(dir) {
      return Err(ToolchainError::NotMainPackage {
        dir: dir.to_path_buf(),
        name: "util".to_string(),
      });
    }
    if self.unlistable.contains(dir) {
      return Err(ToolchainError::CommandFailed {
        command: "go list".to_string(),
        code: Some(1),
        output: format!("no Go files in {}\n", dir.display()),
      });
    }
    let name = dir.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    Ok(PackageIdentity {
      import_path: format!("example.com/{name}"),
      dir: dir.to_path_buf(),
    })
  }

  async fn build(&self, pkg: &PackageIdentity, target: &Target, output: &Path) -> Result<String, ToolchainError> {
    let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
    self.peak.fetch_max(now, Ordering::SeqCst);
    tokio::time::sleep(self.delay).await;
    self.running.fetch_sub(1, Ordering::SeqCst);

    self
      .builds
      .lock()
      .unwrap()
      .push((pkg.dir.clone(), target.clone(), output.to_path_buf()));

    if self.panicking.contains(&pkg.dir) {
      panic!("compiler crashed on {}", pkg.import_path);
    }
    if self.failing.contains(&pkg.dir) {
      return Err(ToolchainError::CommandFailed {
        command: "go build".to_string(),
        code: Some(2),
        output: format!("{}: undefined: x\n", pkg.import_path),
      });
    }
    Ok(format!("built {} for {target}\n", pkg.import_path))
  }
}
