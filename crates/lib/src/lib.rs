//! gobuild-lib: Core types and logic for gobuild
//!
//! This crate provides everything needed to build Go projects for many
//! platforms in parallel:
//! - `config`: the project/platform/action tree and how it is loaded
//! - `expand`: `$NAME` / `${NAME}` substitution in action arguments
//! - `action`: the `exec`, `copy`, and `replace` actions
//! - `toolchain`: the compiler adapter trait and its Go implementation
//! - `schedule`: bounded-concurrency execution of build jobs

pub mod action;
pub mod config;
pub mod expand;
pub mod schedule;
pub mod toolchain;
pub mod util;
