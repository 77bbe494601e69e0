//! Restore command implementation
//!
//! Copies the snapshots in `plugins/<plugin-id>/backup/<platform>/` back
//! over the live platform files. With `--clean` the snapshots are removed
//! afterwards, so the next apply starts a fresh backup.

use anyhow::Result;
use clap::Args;

use custom_config::context::RunContext;
use custom_config::output::{emoji, OutputConfig};
use custom_config::restore::{self, RestoreOptions};

use crate::cli::RunArgs;

/// Arguments for the restore command
#[derive(Args, Debug)]
pub struct RestoreArgs {
    /// Delete each platform's backups after restoring them
    #[arg(long)]
    pub clean: bool,

    /// Restore even if config.xml disables auto-restore
    #[arg(short, long)]
    pub force: bool,

    /// Print the restore report as JSON
    #[arg(long)]
    pub json: bool,
}

/// Execute the restore command
pub fn execute(args: RestoreArgs, run: &RunArgs, out: &OutputConfig) -> Result<()> {
    let ctx = RunContext::load(run.options()?)?;
    let options = RestoreOptions {
        clean: args.clean,
        force: args.force,
    };
    let report = restore::restore_all(&ctx, &options)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    if let Some(reason) = &report.skipped {
        println!("{} Skipped: {}", emoji(out, "⏭️", "[SKIP]"), reason);
        return Ok(());
    }
    for platform in &report.platforms {
        match &platform.error {
            Some(error) => println!("{} {}: {}", emoji(out, "❌", "[ERR]"), platform.platform, error),
            None => {
                for artifact in &platform.restored {
                    println!(
                        "{} {}: restored {}",
                        emoji(out, "♻️", "[RESTORE]"),
                        platform.platform,
                        artifact
                    );
                }
                if platform.cleaned {
                    println!(
                        "{} {}: backups removed",
                        emoji(out, "🧹", "[CLEAN]"),
                        platform.platform
                    );
                }
            }
        }
    }
    println!("{} file(s) restored", report.restored_count());
    Ok(())
}
