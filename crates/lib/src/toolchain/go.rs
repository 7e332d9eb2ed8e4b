//! Go toolchain adapter.
//!
//! Wraps the `go` command: environment discovery (`go env`, `go version`),
//! main-package resolution (`go list`), cross-compiling builds, and
//! preparing cross-compilation support on old releases (`make.bash`).

use std::path::{Path, PathBuf};
use std::process::Output;

use async_trait::async_trait;
use regex::Regex;
use tokio::process::Command;
use tracing::{debug, info};

use super::{PackageIdentity, Target, Toolchain, ToolchainEnv, ToolchainError};

const GO: &str = "go";

/// Toolchain backed by the `go` binary on `PATH`.
#[derive(Debug, Clone)]
pub struct GoToolchain {
  env: ToolchainEnv,
}

impl GoToolchain {
  /// Wrap already-known environment facts.
  pub fn with_env(env: ToolchainEnv) -> Self {
    Self { env }
  }

  /// Discover the host Go installation.
  ///
  /// GOPATH comes from the environment, falling back to `go env GOPATH`.
  pub async fn discover_environment() -> Result<Self, ToolchainError> {
    let root = run_go(&["env", "GOROOT"], None, &[]).await?;
    let version_output = run_go(&["version"], None, &[]).await?;
    let (version, host_os, host_arch) = parse_version(&version_output)?;

    let path = match std::env::var("GOPATH") {
      Ok(path) if !path.is_empty() => path,
      _ => run_go(&["env", "GOPATH"], None, &[]).await?.trim().to_string(),
    };

    let env = ToolchainEnv {
      version,
      host_os,
      host_arch,
      root: PathBuf::from(root.trim()),
      path: PathBuf::from(path),
    };
    info!(version = %env.version, os = %env.host_os, arch = %env.host_arch, "discovered go toolchain");

    Ok(Self { env })
  }

  /// Environment overrides for building for `target`.
  ///
  /// Passed to the child process only; the ambient environment is untouched.
  pub fn build_env(&self, target: &Target) -> Vec<(String, String)> {
    vec![
      ("GOPATH".to_string(), self.env.path.to_string_lossy().to_string()),
      ("GOOS".to_string(), target.os.clone()),
      ("GOARCH".to_string(), target.arch.clone()),
    ]
  }

  /// Build the standard library and tools for cross-compiling to `target`.
  ///
  /// Only needed on Go releases that predate built-in cross-compilation.
  pub async fn build_tools(&self, target: &Target) -> Result<String, ToolchainError> {
    let src = self.env.root.join("src");
    let script = src.join(if cfg!(windows) { "make.bat" } else { "make.bash" });
    let program = script.to_string_lossy().to_string();

    info!(target = %target, script = %program, "building cross-compilation tools");

    let output = Command::new(&script)
      .arg("--no-clean")
      .current_dir(&src)
      .envs(self.build_env(target))
      .output()
      .await
      .map_err(|e| ToolchainError::Spawn {
        program: program.clone(),
        source: e,
      })?;

    if output.status.success() {
      Ok(String::from_utf8_lossy(&output.stdout).to_string())
    } else {
      Err(ToolchainError::CommandFailed {
        command: program,
        code: output.status.code(),
        output: String::from_utf8_lossy(&output.stderr).to_string(),
      })
    }
  }
}

#[async_trait]
impl Toolchain for GoToolchain {
  fn env(&self) -> &ToolchainEnv {
    &self.env
  }

  async fn resolve_package(&self, dir: &Path) -> Result<PackageIdentity, ToolchainError> {
    let listing = run_go(&["list", "-f", "{{.Name}} {{.ImportPath}}", "."], Some(dir), &[]).await?;
    let (name, import_path) = listing.trim().split_once(' ').unwrap_or((listing.trim(), ""));

    if name != "main" {
      return Err(ToolchainError::NotMainPackage {
        dir: dir.to_path_buf(),
        name: name.to_string(),
      });
    }

    Ok(PackageIdentity {
      import_path: import_path.to_string(),
      dir: dir.to_path_buf(),
    })
  }

  async fn build(&self, pkg: &PackageIdentity, target: &Target, output: &Path) -> Result<String, ToolchainError> {
    let output = binary_path(&pkg.dir, output, &target.os);
    let ldflags = format!(
      "-X 'main.BUILD_TIME={}'",
      chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    let output_arg = output.to_string_lossy().to_string();

    debug!(package = %pkg, target = %target, output = %output_arg, "invoking go build");

    run_go(
      &["build", "-ldflags", &ldflags, "-o", &output_arg, "."],
      Some(&pkg.dir),
      &self.build_env(target),
    )
    .await
  }
}

/// Where the binary for `target_os` lands.
///
/// Relative outputs are anchored at the package directory; Windows binaries
/// get an `.exe` suffix.
pub fn binary_path(pkg_dir: &Path, output: &Path, target_os: &str) -> PathBuf {
  let mut path = if output.is_absolute() {
    output.to_path_buf()
  } else {
    pkg_dir.join(output)
  };

  if target_os == "windows" && path.extension().is_none_or(|ext| ext != "exe") {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".exe");
    path.set_file_name(name);
  }

  path
}

/// Parse `go version` output into (version, os, arch).
pub fn parse_version(output: &str) -> Result<(String, String, String), ToolchainError> {
  let re = Regex::new(r"(go\d+\.\d+(?:\.\d+)?\S*) (\w+)/(\w+)")
    .map_err(|_| ToolchainError::UnrecognizedVersion(output.to_string()))?;

  let caps = re
    .captures(output)
    .ok_or_else(|| ToolchainError::UnrecognizedVersion(output.trim().to_string()))?;

  Ok((caps[1].to_string(), caps[2].to_string(), caps[3].to_string()))
}

/// Run `go <args>` and return stdout, or stdout+stderr on failure.
async fn run_go(args: &[&str], dir: Option<&Path>, env: &[(String, String)]) -> Result<String, ToolchainError> {
  let mut command = Command::new(GO);
  command.args(args).envs(env.iter().map(|(k, v)| (k.as_str(), v.as_str())));
  if let Some(dir) = dir {
    command.current_dir(dir);
  }

  let output = command.output().await.map_err(|e| ToolchainError::Spawn {
    program: GO.to_string(),
    source: e,
  })?;

  if !output.status.success() {
    return Err(ToolchainError::CommandFailed {
      command: format!("{GO} {}", args.first().copied().unwrap_or_default()),
      code: output.status.code(),
      output: combined_output(&output),
    });
  }

  Ok(combined_output(&output))
}

fn combined_output(output: &Output) -> String {
  let mut text = String::from_utf8_lossy(&output.stdout).to_string();
  text.push_str(&String::from_utf8_lossy(&output.stderr));
  text
}
