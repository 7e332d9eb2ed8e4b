//! Implementation of `gobuild --init`.
//!
//! Prepares cross-compilation support for each requested platform by
//! rebuilding the Go standard library and tools for it.

use anyhow::{Context, Result};

use gobuild_lib::toolchain::{GoToolchain, Target};

use crate::output::{print_info, print_tools_result};

/// Execute the tools command for `platforms` (each `os/arch`).
///
/// Every platform is attempted; returns whether all succeeded.
pub fn cmd_tools(platforms: &[String], verbose: bool) -> Result<bool> {
  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;

  rt.block_on(async {
    let toolchain = GoToolchain::discover_environment()
      .await
      .context("initialize failed")?;

    print_info("initialize packages and tools...");

    let mut ok = true;
    for platform in platforms {
      let outcome = match Target::parse(platform) {
        Ok(target) => toolchain.build_tools(&target).await,
        Err(e) => Err(e),
      };
      if outcome.is_err() {
        ok = false;
      }
      print_tools_result(platform, &outcome, verbose);
    }

    Ok::<_, anyhow::Error>(ok)
  })
}
