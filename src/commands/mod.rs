//! # CLI Command Implementations
//!
//! One file per `custom-config` subcommand. Each module contains:
//! - An `Args` struct with the command-specific options, derived using `clap`.
//! - An `execute` function that builds a run context from the shared
//!   [`RunArgs`](crate::cli::RunArgs) and calls into the `custom_config`
//!   library.

pub mod apply;
pub mod completions;
pub mod plan;
pub mod restore;
