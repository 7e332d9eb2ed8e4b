//! `exec` action implementation.
//!
//! Runs a program directly (no shell) in the job's base directory with the
//! inherited process environment.

use std::path::Path;

use tokio::process::Command;
use tracing::{debug, info};

use super::types::ActionError;

/// Execute `program` with `args` in `dir`.
///
/// # Returns
///
/// The combined stdout and stderr on success. A launch failure or a non-zero
/// exit is an error; the latter carries the combined output.
pub async fn execute_exec(program: &str, args: &[String], dir: &Path) -> Result<String, ActionError> {
  let cmd = std::iter::once(program)
    .chain(args.iter().map(String::as_str))
    .collect::<Vec<_>>()
    .join(" ");
  info!(cmd = %cmd, "executing command");
  debug!(working_dir = ?dir, "spawning process");

  let output = Command::new(program)
    .args(args)
    .current_dir(dir)
    .output()
    .await
    .map_err(|e| ActionError::Spawn {
      cmd: cmd.clone(),
      source: e,
    })?;

  let mut combined = String::from_utf8_lossy(&output.stdout).to_string();
  combined.push_str(&String::from_utf8_lossy(&output.stderr));

  if !output.status.success() {
    if !combined.is_empty() {
      debug!(output = %combined, "command output");
    }
    return Err(ActionError::CmdFailed {
      cmd,
      code: output.status.code(),
      output: combined,
    });
  }

  Ok(combined)
}
