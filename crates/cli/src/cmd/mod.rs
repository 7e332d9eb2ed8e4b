mod build;
mod tools;

pub use build::{BuildOptions, cmd_build};
pub use tools::cmd_tools;
