//! Action execution.
//!
//! Actions are the side-effect steps that run around a build: `exec` runs a
//! program, `copy` copies files or trees, and `replace` rewrites a file in
//! place. Each action's argument string is split on whitespace and tokens are
//! expanded against the job's variables before use (see [`crate::expand`]).
//!
//! # Action Types
//!
//! - `exec <program> [args...]` - run a program in the base directory
//! - `copy <src> <dest-dir>` - copy a file, directory, or glob into a directory
//! - `replace [-r] <path> <find> <replacement>` - substitute in a file

pub mod copy;
pub mod exec;
pub mod replace;
mod types;

pub use types::*;

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::{Action, Phase};
use crate::expand::{Variables, expand};
use copy::execute_copy;
use exec::execute_exec;
use replace::{MatchMode, ReplaceArgs, execute_replace};

/// Runs actions for one job.
///
/// Holds the job's base directory, its variables, and the active build mode.
/// Relative paths in action arguments resolve against the base directory.
pub struct Executor<'a, V> {
  dir: &'a Path,
  vars: &'a V,
  mode: Option<&'a str>,
}

impl<'a, V: Variables + Sync> Executor<'a, V> {
  pub fn new(dir: &'a Path, vars: &'a V, mode: Option<&'a str>) -> Self {
    Self { dir, vars, mode }
  }

  /// Execute a single action.
  ///
  /// An action whose mode does not match the active mode is skipped without
  /// side effects.
  pub async fn execute(&self, action: &Action) -> Result<ActionOutcome, ActionError> {
    if !action.applies_to(self.mode) {
      debug!(action = %action.name, mode = ?action.mode, "skipping action for inactive mode");
      return Ok(ActionOutcome::Skipped);
    }

    let kind = ActionKind::parse(&action.name)?;
    let tokens: Vec<&str> = action.args.split_whitespace().collect();

    debug!(action = %kind, args = %action.args, "running action");

    match kind {
      ActionKind::Exec => {
        let (program, rest) = tokens
          .split_first()
          .ok_or_else(|| ActionError::malformed(kind, "no command is specified"))?;
        let args: Vec<String> = rest.iter().map(|arg| expand(arg, self.vars)).collect();
        execute_exec(program, &args, self.dir).await?;
      }

      ActionKind::Copy => {
        let [src, dest] = tokens[..] else {
          return Err(ActionError::malformed(kind, "copy action take two arguments"));
        };
        execute_copy(&expand(src, self.vars), &expand(dest, self.vars), self.dir)?;
      }

      ActionKind::Replace => {
        let args = ReplaceArgs::parse(&tokens)?;
        let path = self.resolve(&expand(args.path, self.vars));
        // `$` is regex syntax, so only literal patterns are expanded
        let (find, replacement) = match args.mode {
          MatchMode::Literal => (expand(args.find, self.vars), expand(args.replacement, self.vars)),
          MatchMode::Regex => (args.find.to_string(), args.replacement.to_string()),
        };
        execute_replace(&path, &find, &replacement, args.mode).await?;
      }
    }

    Ok(ActionOutcome::Ran)
  }

  /// Run every action of `phase` in declared order.
  ///
  /// Stops at the first failure. Side effects of earlier actions are kept.
  ///
  /// # Returns
  ///
  /// The number of actions that ran (skipped actions are not counted).
  pub async fn run_phase(&self, actions: &[Action], phase: Phase) -> Result<usize, PhaseError> {
    let mut ran = 0;

    for (index, action) in actions.iter().enumerate().filter(|(_, a)| a.on == phase) {
      match self.execute(action).await {
        Ok(ActionOutcome::Ran) => ran += 1,
        Ok(ActionOutcome::Skipped) => {}
        Err(source) => {
          return Err(PhaseError {
            phase,
            index,
            action: action.name.clone(),
            source,
          });
        }
      }
    }

    Ok(ran)
  }

  fn resolve(&self, arg: &str) -> PathBuf {
    let path = Path::new(arg);
    if path.is_absolute() {
      path.to_path_buf()
    } else {
      self.dir.join(path)
    }
  }
}
