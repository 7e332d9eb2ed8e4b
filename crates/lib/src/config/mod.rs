//! Build configuration loading.
//!
//! A config is a TOML document (`build.toml`) describing projects, the
//! platforms each is built for, and the actions that run around each build.
//! Loading also resolves every project's absolute path, which stays fixed for
//! the rest of the run.

mod types;

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

pub use types::{Action, BuildConfig, Phase, Platform, Project};

/// Config file looked up when the target is a directory.
pub const CONFIG_FILE_NAME: &str = "build.toml";

/// Output template used by the built-in default config.
pub const DEFAULT_OUTPUT: &str = "${GOPATH}/bin/${PKGNAME}/${PKGNAME}";

/// Errors that can occur while locating or reading a config.
#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("can not find directory or file: {0}")]
  TargetNotFound(PathBuf),

  #[error("failed to read config {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to parse config {path}: {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: toml::de::Error,
  },
}

/// How the command-line target was interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
  /// An absolute path or one starting with `.`.
  Filesystem,
  /// A Go import path, located under `$GOPATH/src`.
  ImportPath,
}

/// A config ready for scheduling: every project has its full path set.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
  /// The config file path (may not exist when `defaulted` is set).
  pub path: PathBuf,
  pub config: BuildConfig,
  /// True when no config file was found and the default was used.
  pub defaulted: bool,
}

/// The config used when a target directory has no `build.toml`.
///
/// One project at the config directory, built for the host platform, copying
/// `config/*.conf` next to the binary after a successful build.
pub fn default_config() -> BuildConfig {
  let platform = Platform {
    output: DEFAULT_OUTPUT.to_string(),
    actions: vec![Action::new("copy", "config/*.conf ${OUTPUTDIR}/config", Phase::After)],
    ..Default::default()
  };

  BuildConfig {
    projects: vec![Project::new("", vec![platform])],
  }
}

/// Interpret a command-line target.
pub fn resolve_target(target: &str, cwd: &Path, gopath: &Path) -> (PathBuf, TargetKind) {
  let path = Path::new(target);
  if path.is_absolute() {
    (path.to_path_buf(), TargetKind::Filesystem)
  } else if target.starts_with('.') {
    (cwd.join(path), TargetKind::Filesystem)
  } else {
    (gopath.join("src").join(path), TargetKind::ImportPath)
  }
}

/// Load the config for `target` and resolve every project's full path.
///
/// # Errors
///
/// Fails if the target does not exist, or if the config file exists but
/// cannot be read or parsed.
pub fn load(target: &str, cwd: &Path, gopath: &Path) -> Result<LoadedConfig, ConfigError> {
  let (target_path, kind) = resolve_target(target, cwd, gopath);

  if !target_path.exists() {
    return Err(ConfigError::TargetNotFound(target_path));
  }
  let target_path = dunce::canonicalize(&target_path).map_err(|e| ConfigError::Read {
    path: target_path.clone(),
    source: e,
  })?;

  let config_path = if target_path.is_dir() {
    target_path.join(CONFIG_FILE_NAME)
  } else {
    target_path
  };

  let (config, defaulted) = match std::fs::read_to_string(&config_path) {
    Ok(content) => {
      let config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
        path: config_path.clone(),
        source: e,
      })?;
      (config, false)
    }
    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
      info!(path = ?config_path, "no config file found, using default config");
      (default_config(), true)
    }
    Err(e) => {
      return Err(ConfigError::Read {
        path: config_path,
        source: e,
      });
    }
  };

  let config_dir = config_path.parent().unwrap_or(Path::new("/")).to_path_buf();
  let config = resolve_projects(config, &config_dir, kind, gopath);

  debug!(path = ?config_path, projects = config.projects.len(), "loaded config");

  Ok(LoadedConfig {
    path: config_path,
    config,
    defaulted,
  })
}

/// Set each project's full path.
///
/// Absolute paths are kept, empty paths mean the config directory, and
/// relative paths are joined to the config directory or, for import-path
/// targets, to `$GOPATH/src`.
pub fn resolve_projects(mut config: BuildConfig, config_dir: &Path, kind: TargetKind, gopath: &Path) -> BuildConfig {
  config.projects = config
    .projects
    .into_iter()
    .map(|project| {
      let path = Path::new(&project.path);
      let full_path = if path.is_absolute() {
        path.to_path_buf()
      } else if project.path.is_empty() {
        config_dir.to_path_buf()
      } else {
        match kind {
          TargetKind::Filesystem => config_dir.join(path),
          TargetKind::ImportPath => gopath.join("src").join(path),
        }
      };
      project.with_full_path(full_path)
    })
    .collect();
  config
}
