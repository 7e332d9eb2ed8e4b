//! `copy` action implementation.
//!
//! The destination is always a directory. Sources are copied into it under
//! their own base name:
//!
//! - a glob copies every match (zero matches is a no-op)
//! - a file is copied to `dest/<name>`
//! - a directory is recreated as `dest/<name>/...`
//!
//! File and directory permission bits are preserved.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use super::types::ActionError;

/// Characters that make a source argument a glob.
const GLOB_CHARS: [char; 3] = ['*', '?', '['];

/// Returns true if `arg` should be treated as a glob pattern.
pub fn is_glob(arg: &str) -> bool {
  arg.contains(GLOB_CHARS)
}

/// Copy `src` into the directory `dest`, resolving relative paths against `base`.
///
/// # Returns
///
/// The number of files copied.
pub fn execute_copy(src: &str, dest: &str, base: &Path) -> Result<usize, ActionError> {
  let dest = resolve(base, dest);

  if is_glob(src) {
    let pattern = if Path::new(src).is_absolute() {
      src.to_string()
    } else {
      // The base directory is literal text, not part of the pattern
      let base = glob::Pattern::escape(&base.to_string_lossy());
      format!("{base}{}{src}", std::path::MAIN_SEPARATOR)
    };
    return copy_glob(&pattern, &dest);
  }

  let src = resolve(base, src);
  let metadata = fs::metadata(&src).map_err(|e| ActionError::io(&src, e))?;

  if metadata.is_dir() {
    copy_tree(&src, &dest.join(base_name(&src)))
  } else {
    create_dir(&dest)?;
    copy_file(&src, &dest.join(base_name(&src)))?;
    Ok(1)
  }
}

fn resolve(base: &Path, arg: &str) -> PathBuf {
  let path = Path::new(arg);
  if path.is_absolute() {
    path.to_path_buf()
  } else {
    base.join(path)
  }
}

fn base_name(path: &Path) -> &std::ffi::OsStr {
  path.file_name().unwrap_or(path.as_os_str())
}

fn copy_glob(pattern: &str, dest: &Path) -> Result<usize, ActionError> {
  let paths = glob::glob(pattern).map_err(|e| ActionError::InvalidGlob {
    pattern: pattern.to_string(),
    source: e,
  })?;

  let mut matches = Vec::new();
  for entry in paths {
    let path = entry.map_err(|e| {
      let path = e.path().to_path_buf();
      ActionError::io(path, e.into_error())
    })?;
    matches.push(path);
  }

  if matches.is_empty() {
    debug!(pattern = %pattern, "glob matched nothing, skipping copy");
    return Ok(0);
  }

  create_dir(dest)?;

  let mut copied = 0;
  for path in matches {
    let target = dest.join(base_name(&path));
    if path.is_dir() {
      copied += copy_tree(&path, &target)?;
    } else {
      copy_file(&path, &target)?;
      copied += 1;
    }
  }

  Ok(copied)
}

/// Recreate the tree rooted at `src` at `dest`.
fn copy_tree(src: &Path, dest: &Path) -> Result<usize, ActionError> {
  let mut copied = 0;
  let mut dirs = Vec::new();

  for entry in WalkDir::new(src).sort_by_file_name() {
    let entry = entry.map_err(|e| ActionError::Walk {
      path: src.to_path_buf(),
      source: e,
    })?;

    let relative = entry.path().strip_prefix(src).unwrap_or(Path::new(""));
    let target = dest.join(relative);

    if entry.file_type().is_dir() {
      create_dir(&target)?;
      let metadata = entry.metadata().map_err(|e| ActionError::Walk {
        path: entry.path().to_path_buf(),
        source: e,
      })?;
      dirs.push((target, metadata.permissions()));
    } else {
      copy_file(entry.path(), &target)?;
      copied += 1;
    }
  }

  // Directory modes last, deepest first, so read-only directories can still be filled
  for (dir, permissions) in dirs.into_iter().rev() {
    fs::set_permissions(&dir, permissions).map_err(|e| ActionError::io(&dir, e))?;
  }

  debug!(src = ?src, dest = ?dest, files = copied, "copied directory");
  Ok(copied)
}

/// Copy a single file, creating parent directories as needed.
///
/// `fs::copy` carries the source's permission bits over to the destination.
fn copy_file(src: &Path, dest: &Path) -> Result<(), ActionError> {
  if let Some(parent) = dest.parent() {
    create_dir(parent)?;
  }
  fs::copy(src, dest).map_err(|e| ActionError::io(src, e))?;
  Ok(())
}

fn create_dir(dir: &Path) -> Result<(), ActionError> {
  fs::create_dir_all(dir).map_err(|e| ActionError::io(dir, e))
}
