//! CLI output formatting utilities.
//!
//! Provides consistent formatting for terminal output including colored status
//! messages, per-job result lines, and human-readable durations.

use std::time::Duration;

use owo_colors::{OwoColorize, Stream};

use gobuild_lib::schedule::{BuildResult, RunSummary};
use gobuild_lib::toolchain::ToolchainError;

pub mod symbols {
  pub const SUCCESS: &str = "✓";
  pub const ERROR: &str = "✗";
  pub const WARNING: &str = "⚠";
  pub const INFO: &str = "•";
  pub const PROMPT: &str = ">>";
}

pub fn format_duration(duration: Duration) -> String {
  let secs = duration.as_secs();
  let millis = duration.subsec_millis();

  if secs >= 60 {
    let mins = secs / 60;
    let remaining_secs = secs % 60;
    format!("{}m {}s", mins, remaining_secs)
  } else if secs > 0 {
    format!("{}.{:02}s", secs, millis / 10)
  } else {
    format!("{}ms", millis)
  }
}

/// Print one job's report line, followed by the build log when `verbose`.
pub fn print_result(result: &BuildResult, verbose: bool) {
  let status = if result.is_success() {
    "success".if_supports_color(Stream::Stdout, |s| s.green()).to_string()
  } else {
    "failed".if_supports_color(Stream::Stdout, |s| s.red()).to_string()
  };
  println!("{}", result_line(result, &status));

  if verbose && !result.output.is_empty() {
    println!("{}", result.output.trim_end());
  }
}

/// `>> pkg(os/arch) -> status[, error: ...] (elapsed)`
fn result_line(result: &BuildResult, status: &str) -> String {
  let mut line = format!("{} {} -> {}", symbols::PROMPT, result, status);
  if let Some(e) = &result.error {
    line.push_str(&format!(", error: {e}"));
  }
  line.push_str(&format!(" ({})", format_duration(result.elapsed)));
  line
}

/// Print one `--init` platform's report line, followed by the tool output
/// when `verbose`.
pub fn print_tools_result(platform: &str, outcome: &Result<String, ToolchainError>, verbose: bool) {
  match outcome {
    Ok(_) => println!(
      "{} {:>15} -> {}",
      symbols::PROMPT,
      platform,
      "success".if_supports_color(Stream::Stdout, |s| s.green())
    ),
    Err(e) => println!(
      "{} {:>15} -> {}, error: {}",
      symbols::PROMPT,
      platform,
      "failed".if_supports_color(Stream::Stdout, |s| s.red()),
      e
    ),
  }

  let log = tools_log(outcome);
  if verbose && !log.is_empty() {
    println!("{}", log.trim_end());
  }
}

/// Captured script output, whether the run succeeded or failed.
fn tools_log(outcome: &Result<String, ToolchainError>) -> &str {
  match outcome {
    Ok(output) => output,
    Err(e) => e.output().unwrap_or_default(),
  }
}

pub fn format_summary(summary: &RunSummary) -> String {
  format!(
    "{} succeeded, {} failed ({} total)",
    summary.succeeded(),
    summary.failed,
    summary.total
  )
}

pub fn print_summary(summary: &RunSummary) {
  if summary.is_success() {
    print_success(&format_summary(summary));
  } else {
    print_error(&format_summary(summary));
  }
}

pub fn print_success(message: &str) {
  println!(
    "{} {}",
    symbols::SUCCESS.if_supports_color(Stream::Stdout, |s| s.green()),
    message
  );
}

pub fn print_error(message: &str) {
  eprintln!(
    "{} {}",
    symbols::ERROR.if_supports_color(Stream::Stderr, |s| s.red()),
    message.if_supports_color(Stream::Stderr, |s| s.red())
  );
}

pub fn print_warning(message: &str) {
  eprintln!(
    "{} {}",
    symbols::WARNING.if_supports_color(Stream::Stderr, |s| s.yellow()),
    message.if_supports_color(Stream::Stderr, |s| s.yellow())
  );
}

pub fn print_info(message: &str) {
  println!(
    "{} {}",
    symbols::INFO.if_supports_color(Stream::Stdout, |s| s.blue()),
    message
  );
}
