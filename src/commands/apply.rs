//! Apply command implementation
//!
//! Runs the full merge for the selected platforms:
//! 1. Restore pristine artifacts from the backup store (unless disabled)
//! 2. Resolve config.xml into merge items per artifact
//! 3. Merge each artifact, snapshotting it before its first write
//!
//! Platform failures are logged and reported; they only fail the command
//! when the `stoponerror` setting is enabled.

use anyhow::Result;
use clap::Args;

use custom_config::context::RunContext;
use custom_config::merge;
use custom_config::output::{emoji, OutputConfig};
use custom_config::report::{ArtifactOutcome, MergeReport};

use crate::cli::RunArgs;

/// Arguments for the apply command
#[derive(Args, Debug)]
pub struct ApplyArgs {
    /// Show what would be done without making changes
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Print the merge report as JSON
    #[arg(long)]
    pub json: bool,
}

/// Execute the apply command
pub fn execute(args: ApplyArgs, run: &RunArgs, out: &OutputConfig) -> Result<()> {
    let mut options = run.options()?;
    options.dry_run = args.dry_run;
    let mut ctx = RunContext::load(options)?;

    let report = merge::apply(&mut ctx)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&report, out);
    }

    report.check(ctx.stop_on_error())?;
    Ok(())
}

fn print_summary(report: &MergeReport, out: &OutputConfig) {
    if let Some(reason) = &report.skipped {
        println!("{} Skipped: {}", emoji(out, "⏭️", "[SKIP]"), reason);
        return;
    }
    if report.dry_run {
        println!("{} DRY RUN - no files were written", emoji(out, "🔎", "[DRY]"));
    }

    for platform in &report.platforms {
        if let Some(error) = &platform.error {
            println!("{} {}: {}", emoji(out, "❌", "[ERR]"), platform.platform, error);
            continue;
        }
        for artifact in &platform.artifacts {
            let marker = match artifact.outcome {
                ArtifactOutcome::Modified => emoji(out, "✅", "[OK]"),
                ArtifactOutcome::Unchanged => emoji(out, "➖", "[--]"),
                ArtifactOutcome::Missing => emoji(out, "❔", "[??]"),
                ArtifactOutcome::Abandoned => emoji(out, "⚠️", "[WARN]"),
            };
            let outcome = match artifact.outcome {
                ArtifactOutcome::Modified if report.dry_run => "would be modified",
                ArtifactOutcome::Modified => "modified",
                ArtifactOutcome::Unchanged => "unchanged",
                ArtifactOutcome::Missing => "not found",
                ArtifactOutcome::Abandoned => "abandoned",
            };
            print!(
                "{} {}: {} {} ({} applied",
                marker, platform.platform, artifact.artifact, outcome, artifact.applied
            );
            if !artifact.skipped.is_empty() {
                print!(", {} skipped", artifact.skipped.len());
            }
            println!(")");
        }
    }
    println!("{} file(s) modified", report.modified_count());
}
