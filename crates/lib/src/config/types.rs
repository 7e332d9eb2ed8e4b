//! Project, platform, and action records.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// The top-level config document: an ordered list of projects.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildConfig {
  #[serde(rename = "project", default)]
  pub projects: Vec<Project>,
}

/// A buildable Go main package and the platforms to build it for.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
  /// Display name; falls back to the path when unset.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,

  /// Path as written in the config (absolute, relative, or empty).
  #[serde(default)]
  pub path: String,

  #[serde(rename = "platform", default)]
  pub platforms: Vec<Platform>,

  /// Absolute path, resolved once when the config is loaded.
  #[serde(skip)]
  full_path: PathBuf,
}

impl Project {
  pub fn new(path: impl Into<String>, platforms: Vec<Platform>) -> Self {
    Self {
      name: None,
      path: path.into(),
      platforms,
      full_path: PathBuf::new(),
    }
  }

  /// Returns the resolved absolute path of the project.
  pub fn full_path(&self) -> &Path {
    &self.full_path
  }

  /// Returns a copy of this project anchored at `full_path`.
  pub fn with_full_path(mut self, full_path: impl Into<PathBuf>) -> Self {
    self.full_path = full_path.into();
    self
  }

  pub fn display_name(&self) -> &str {
    match &self.name {
      Some(name) => name,
      None => &self.path,
    }
  }
}

/// One build target for a project.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Platform {
  /// Target GOOS; empty means the host OS.
  #[serde(default)]
  pub os: String,

  /// Target GOARCH; empty means the host architecture.
  #[serde(default)]
  pub arch: String,

  /// Output path template.
  #[serde(default)]
  pub output: String,

  /// Only build this platform when the host OS matches.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub on: Option<String>,

  #[serde(rename = "action", default)]
  pub actions: Vec<Action>,
}

impl Platform {
  /// Returns true if this platform should be built on `host_os`.
  pub fn runs_on(&self, host_os: &str) -> bool {
    match self.on.as_deref() {
      None | Some("") => true,
      Some(os) => os == host_os,
    }
  }
}

/// When an action runs relative to the build step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
  Before,
  #[default]
  After,
}

impl Phase {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Before => "before",
      Self::After => "after",
    }
  }
}

impl fmt::Display for Phase {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

/// A side-effect step attached to a platform.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
  /// `exec`, `copy`, or `replace`.
  pub name: String,

  /// Space-delimited arguments, expanded per token.
  #[serde(default)]
  pub args: String,

  /// Only run under this build mode.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub mode: Option<String>,

  #[serde(default)]
  pub on: Phase,
}

impl Action {
  pub fn new(name: impl Into<String>, args: impl Into<String>, on: Phase) -> Self {
    Self {
      name: name.into(),
      args: args.into(),
      mode: None,
      on,
    }
  }

  pub fn with_mode(mut self, mode: impl Into<String>) -> Self {
    self.mode = Some(mode.into());
    self
  }

  /// Returns true if this action applies under the active build mode.
  ///
  /// An action without a mode always applies.
  pub fn applies_to(&self, active: Option<&str>) -> bool {
    match self.mode.as_deref() {
      None | Some("") => true,
      Some(mode) => active == Some(mode),
    }
  }
}
