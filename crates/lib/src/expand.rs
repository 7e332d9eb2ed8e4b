//! Variable expansion for action arguments and output templates.
//!
//! Templates reference per-job variables with either `${NAME}` or `$NAME`.
//! Expansion never fails: a name missing from the context expands to the
//! empty string. `${}` is dropped, and an unclosed `${` loses only those
//! two characters.
//!
//! # Syntax
//!
//! - `${NAME}` - braced reference, `NAME` is everything up to the closing `}`
//! - `$NAME` - bare reference, `NAME` is the longest run of `[A-Za-z0-9_]`
//! - `$1`, `$*`, `$#`, ... - single-character special names
//! - `$` followed by anything else is kept literally
//!
//! # Example
//!
//! ```
//! use std::collections::HashMap;
//! use gobuild_lib::expand::expand;
//!
//! let vars = HashMap::from([
//!   ("GOOS".to_string(), "linux".to_string()),
//!   ("GOARCH".to_string(), "amd64".to_string()),
//! ]);
//! assert_eq!(expand("${GOOS}-$GOARCH/${MISSING}", &vars), "linux-amd64/");
//! ```

use std::collections::{BTreeMap, HashMap};

/// A segment of parsed template text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
  /// Literal text (no variables)
  Literal(String),

  /// A variable reference to be looked up
  Variable(String),
}

/// Source of variable values during expansion.
pub trait Variables {
  /// Look up a variable by name.
  fn lookup(&self, name: &str) -> Option<&str>;
}

impl Variables for HashMap<String, String> {
  fn lookup(&self, name: &str) -> Option<&str> {
    self.get(name).map(String::as_str)
  }
}

impl Variables for BTreeMap<String, String> {
  fn lookup(&self, name: &str) -> Option<&str> {
    self.get(name).map(String::as_str)
  }
}

fn is_name_char(c: char) -> bool {
  c == '_' || c.is_ascii_alphanumeric()
}

fn is_special_char(c: char) -> bool {
  matches!(c, '*' | '#' | '$' | '@' | '!' | '?' | '-') || c.is_ascii_digit()
}

/// Parse a template into literal and variable segments.
pub fn parse(input: &str) -> Vec<Segment> {
  let mut segments = Vec::new();
  let mut literal = String::new();
  let mut chars = input.chars().peekable();

  while let Some(ch) = chars.next() {
    if ch != '$' {
      literal.push(ch);
      continue;
    }

    let name = match chars.peek().copied() {
      Some('{') => {
        chars.next(); // consume the {
        let after_brace = chars.clone();

        let mut name = String::new();
        let mut found_close = false;
        for c in chars.by_ref() {
          if c == '}' {
            found_close = true;
            break;
          }
          name.push(c);
        }

        // An unclosed `${` drops only those two characters; the rest is rescanned
        if !found_close {
          chars = after_brace;
          continue;
        }
        // `${}` is dropped from the output
        if name.is_empty() {
          continue;
        }
        name
      }
      Some(c) if is_special_char(c) => {
        chars.next();
        c.to_string()
      }
      Some(c) if is_name_char(c) => {
        let mut name = String::new();
        while let Some(&c) = chars.peek() {
          if !is_name_char(c) {
            break;
          }
          name.push(c);
          chars.next();
        }
        name
      }
      _ => {
        // A lone $ is kept as is
        literal.push('$');
        continue;
      }
    };

    if !literal.is_empty() {
      segments.push(Segment::Literal(std::mem::take(&mut literal)));
    }
    segments.push(Segment::Variable(name));
  }

  if !literal.is_empty() {
    segments.push(Segment::Literal(literal));
  }

  segments
}

/// Expand pre-parsed segments against a variable source.
pub fn expand_segments(segments: &[Segment], vars: &impl Variables) -> String {
  let mut result = String::new();

  for segment in segments {
    match segment {
      Segment::Literal(s) => result.push_str(s),
      Segment::Variable(name) => result.push_str(vars.lookup(name).unwrap_or_default()),
    }
  }

  result
}

/// Expand every variable reference in `template`.
///
/// Unknown names expand to the empty string. A template without any `$` is
/// returned unchanged.
pub fn expand(template: &str, vars: &impl Variables) -> String {
  if !template.contains('$') {
    return template.to_string();
  }
  expand_segments(&parse(template), vars)
}
