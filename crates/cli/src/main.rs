mod cmd;
mod output;

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cmd::{cmd_build, cmd_tools};

/// gobuild - build Go projects for many platforms in parallel
#[derive(Parser)]
#[command(name = "gobuild")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Project directory, build config file, or Go import path
  #[arg(default_value = ".")]
  target: String,

  /// Number of parallel build jobs (0 = number of CPUs)
  #[arg(short, long, default_value_t = 0)]
  parallel: usize,

  /// Enable verbose output
  #[arg(short, long)]
  verbose: bool,

  /// Build mode, e.g. develop, test, or publish
  #[arg(short, long)]
  mode: Option<String>,

  /// Initialize cross-compilation tools for os/arch[,os/arch...]
  #[arg(short, long, value_delimiter = ',', value_name = "PLATFORMS")]
  init: Vec<String>,
}

fn main() -> ExitCode {
  let cli = Cli::parse();

  let default_level = if cli.verbose { "info" } else { "warn" };
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  let result = if cli.init.is_empty() {
    cmd_build(cmd::BuildOptions {
      target: cli.target,
      parallel: cli.parallel,
      mode: cli.mode,
      verbose: cli.verbose,
    })
  } else {
    cmd_tools(&cli.init, cli.verbose)
  };

  match result {
    Ok(true) => ExitCode::SUCCESS,
    Ok(false) => ExitCode::FAILURE,
    Err(e) => {
      output::print_error(&format!("{e:#}"));
      ExitCode::FAILURE
    }
  }
}
