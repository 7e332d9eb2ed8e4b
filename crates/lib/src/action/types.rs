//! Action kinds, outcomes, and errors.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::config::Phase;

/// The supported action names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
  Exec,
  Copy,
  Replace,
}

impl ActionKind {
  pub fn parse(name: &str) -> Result<Self, ActionError> {
    match name {
      "exec" => Ok(Self::Exec),
      "copy" => Ok(Self::Copy),
      "replace" => Ok(Self::Replace),
      other => Err(ActionError::Unsupported(other.to_string())),
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Exec => "exec",
      Self::Copy => "copy",
      Self::Replace => "replace",
    }
  }
}

impl fmt::Display for ActionKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

/// What happened to a single action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
  /// The action ran to completion.
  Ran,
  /// The action's mode did not match the active build mode.
  Skipped,
}

/// Errors raised by a single action.
#[derive(Debug, Error)]
pub enum ActionError {
  #[error("action [{0}] is not supported")]
  Unsupported(String),

  #[error("malformed {action} arguments: {message}")]
  MalformedArgs { action: ActionKind, message: String },

  #[error("{path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to traverse {path}: {source}")]
  Walk {
    path: PathBuf,
    #[source]
    source: walkdir::Error,
  },

  #[error("invalid glob pattern {pattern}: {source}")]
  InvalidGlob {
    pattern: String,
    #[source]
    source: glob::PatternError,
  },

  #[error("invalid regular expression {pattern}: {source}")]
  InvalidPattern {
    pattern: String,
    #[source]
    source: regex::Error,
  },

  #[error("failed to launch {cmd}: {source}")]
  Spawn {
    cmd: String,
    #[source]
    source: std::io::Error,
  },

  #[error("command failed with exit code {code:?}: {cmd}, output:\n{output}")]
  CmdFailed {
    cmd: String,
    code: Option<i32>,
    output: String,
  },
}

impl ActionError {
  pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
    Self::Io {
      path: path.into(),
      source,
    }
  }

  pub(crate) fn malformed(action: ActionKind, message: impl Into<String>) -> Self {
    Self::MalformedArgs {
      action,
      message: message.into(),
    }
  }
}

/// An action failure attributed to its position in a phase.
#[derive(Debug, Error)]
#[error("{phase} action #{index} ({action}) failed: {source}")]
pub struct PhaseError {
  pub phase: Phase,
  /// Position of the action within the platform's action list.
  pub index: usize,
  /// The action name as written in the config.
  pub action: String,
  #[source]
  pub source: ActionError,
}
