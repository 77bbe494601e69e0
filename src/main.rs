//! # Custom Config CLI
//!
//! Binary entry point for the `custom-config` command-line tool.
//!
//! It parses arguments with `clap`, installs the logger and dispatches to
//! the selected command. The merge engine itself lives in the library
//! crate, so the binary stays a thin wrapper around it.

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    cli.execute()
}
