//! `replace` action implementation.
//!
//! Rewrites a file in place, replacing every occurrence of a literal string
//! or regular expression. The file keeps its permission bits.

use std::path::Path;

use regex::bytes::{NoExpand, Regex, RegexBuilder};
use tokio::fs;
use tracing::debug;

use super::types::{ActionError, ActionKind};

/// How the `find` argument is matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchMode {
  #[default]
  Literal,
  /// Multi-line regular expression; `$1`/`${name}` expand in the replacement.
  Regex,
}

/// Parsed `replace` arguments: `[-r] <path> <find> <replacement>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplaceArgs<'a> {
  pub mode: MatchMode,
  pub path: &'a str,
  pub find: &'a str,
  pub replacement: &'a str,
}

impl<'a> ReplaceArgs<'a> {
  pub fn parse(tokens: &'a [&'a str]) -> Result<Self, ActionError> {
    let mut mode = MatchMode::Literal;
    let mut rest = tokens;

    while let Some((first, tail)) = rest.split_first() {
      match *first {
        "-r" => mode = MatchMode::Regex,
        "--" => {
          rest = tail;
          break;
        }
        flag if flag.starts_with('-') && flag.len() > 1 => {
          return Err(ActionError::malformed(ActionKind::Replace, format!("unknown flag {flag}")));
        }
        _ => break,
      }
      rest = tail;
    }

    match *rest {
      [path, find, replacement] => Ok(Self {
        mode,
        path,
        find,
        replacement,
      }),
      _ => Err(ActionError::malformed(
        ActionKind::Replace,
        "replace action should take 3 arguments",
      )),
    }
  }
}

/// Replace all matches of `find` in the file at `path`.
///
/// # Returns
///
/// The number of replaced occurrences.
pub async fn execute_replace(path: &Path, find: &str, replacement: &str, mode: MatchMode) -> Result<usize, ActionError> {
  let regex = compile(find, mode)?;

  let metadata = fs::metadata(path).await.map_err(|e| ActionError::io(path, e))?;
  let content = fs::read(path).await.map_err(|e| ActionError::io(path, e))?;

  let count = regex.find_iter(&content).count();
  let replaced = match mode {
    MatchMode::Literal => regex.replace_all(&content, NoExpand(replacement.as_bytes())),
    MatchMode::Regex => regex.replace_all(&content, replacement.as_bytes()),
  };

  fs::write(path, replaced.as_ref())
    .await
    .map_err(|e| ActionError::io(path, e))?;
  fs::set_permissions(path, metadata.permissions())
    .await
    .map_err(|e| ActionError::io(path, e))?;

  debug!(path = ?path, count, "replaced matches");
  Ok(count)
}

fn compile(find: &str, mode: MatchMode) -> Result<Regex, ActionError> {
  let pattern = match mode {
    MatchMode::Literal => regex::escape(find),
    MatchMode::Regex => find.to_string(),
  };

  RegexBuilder::new(&pattern)
    .multi_line(mode == MatchMode::Regex)
    .build()
    .map_err(|e| ActionError::InvalidPattern {
      pattern: find.to_string(),
      source: e,
    })
}
