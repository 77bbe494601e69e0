//! # Plan Command Implementation
//!
//! Read-only view of what `apply` would do: the merge items resolved from
//! `config.xml`, grouped per platform and artifact in application order.
//! Nothing is read from the platform directories except their names.

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use custom_config::context::RunContext;
use custom_config::resolver::{self, ArtifactPlan};

use crate::cli::RunArgs;

/// Show the resolved merge items without touching any file
#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Print the plan as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct PlatformPlan {
    platform: String,
    artifacts: Vec<ArtifactPlan>,
}

/// Execute the `plan` command.
pub fn execute(args: PlanArgs, run: &RunArgs) -> Result<()> {
    let ctx = RunContext::load(run.options()?)?;
    let mut plans = Vec::new();
    for platform in ctx.platforms()? {
        let entries = ctx.manifest.read_entries(&platform);
        plans.push(PlatformPlan {
            artifacts: resolver::resolve_platform(&platform, &entries),
            platform,
        });
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&plans)?);
        return Ok(());
    }

    for plan in &plans {
        println!("{}:", plan.platform);
        if plan.artifacts.is_empty() {
            println!("  (nothing to apply)");
        }
        for artifact in &plan.artifacts {
            let path = artifact
                .artifact
                .live_path(&ctx.platform_dir(&plan.platform), &ctx.manifest)
                .map(|p| p.display().to_string())
                .unwrap_or_else(|_| artifact.artifact.to_string());
            println!("  {}", path);
            for item in &artifact.items {
                println!("    {}", item);
            }
        }
    }
    Ok(())
}
