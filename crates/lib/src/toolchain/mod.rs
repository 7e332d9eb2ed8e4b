//! Toolchain adapter.
//!
//! The scheduler talks to the compiler only through the [`Toolchain`] trait:
//! host facts, package resolution, and the build invocation itself. The Go
//! implementation lives in [`go`]; tests substitute their own.

pub mod go;

use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;

pub use go::GoToolchain;

/// Host facts discovered from the toolchain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolchainEnv {
  /// Toolchain version, e.g. `go1.22.3`.
  pub version: String,
  /// Host OS in toolchain naming (`linux`, `darwin`, `windows`, ...).
  pub host_os: String,
  /// Host architecture in toolchain naming (`amd64`, `arm64`, ...).
  pub host_arch: String,
  /// Toolchain installation root (GOROOT).
  pub root: PathBuf,
  /// Base path for packages and binaries (GOPATH).
  pub path: PathBuf,
}

/// A target (os, arch) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Target {
  pub os: String,
  pub arch: String,
}

impl Target {
  pub fn new(os: impl Into<String>, arch: impl Into<String>) -> Self {
    Self {
      os: os.into(),
      arch: arch.into(),
    }
  }

  /// Parse an `os/arch` pair.
  pub fn parse(pair: &str) -> Result<Self, ToolchainError> {
    match pair.split_once('/') {
      Some((os, arch)) if !os.is_empty() && !arch.is_empty() && !arch.contains('/') => Ok(Self::new(os, arch)),
      _ => Err(ToolchainError::InvalidTarget(pair.to_string())),
    }
  }
}

impl fmt::Display for Target {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}/{}", self.os, self.arch)
  }
}

/// A resolved buildable unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageIdentity {
  /// Fully-qualified name, e.g. `github.com/acme/tool/cmd/server`.
  pub import_path: String,
  /// Directory the package was resolved from.
  pub dir: PathBuf,
}

impl fmt::Display for PackageIdentity {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.import_path)
  }
}

/// Errors reported by a toolchain.
#[derive(Debug, Error)]
pub enum ToolchainError {
  #[error("failed to run {program}: {source}")]
  Spawn {
    program: String,
    #[source]
    source: std::io::Error,
  },

  #[error("{command} failed with exit code {code:?}")]
  CommandFailed {
    command: String,
    code: Option<i32>,
    output: String,
  },

  #[error("can not get version info from result: {0}")]
  UnrecognizedVersion(String),

  #[error("no buildable main package in {dir} (found package {name})")]
  NotMainPackage { dir: PathBuf, name: String },

  #[error("platform invalid: {0}")]
  InvalidTarget(String),
}

impl ToolchainError {
  /// Captured tool output, if the failure carried any.
  pub fn output(&self) -> Option<&str> {
    match self {
      Self::CommandFailed { output, .. } => Some(output),
      _ => None,
    }
  }
}

/// The compiler-facing operations the scheduler depends on.
#[async_trait]
pub trait Toolchain: Send + Sync {
  /// Host facts discovered when the toolchain was initialised.
  fn env(&self) -> &ToolchainEnv;

  /// Resolve the package at `dir`.
  ///
  /// Fails if no buildable main package is found there.
  async fn resolve_package(&self, dir: &Path) -> Result<PackageIdentity, ToolchainError>;

  /// Build `pkg` for `target`, writing the binary to `output`.
  ///
  /// Returns the combined compiler output. On failure the output is carried
  /// by the error (see [`ToolchainError::output`]).
  async fn build(&self, pkg: &PackageIdentity, target: &Target, output: &Path) -> Result<String, ToolchainError>;
}
