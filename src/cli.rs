//! CLI argument parsing and command dispatch

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use log::LevelFilter;

use custom_config::backup::DEFAULT_PLUGIN_ID;
use custom_config::context::{RunOptions, DEFAULT_HOOK};
use custom_config::logging;
use custom_config::output::OutputConfig;

use crate::commands;

/// Custom Config - Merge config.xml preferences into Android and iOS project files
#[derive(Parser, Debug)]
#[command(name = "custom-config")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Colorize output (always, never, auto)
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    color: String,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL", default_value = "info")]
    log_level: String,

    /// Shorthand for --log-level debug
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(flatten)]
    run: RunArgs,
}

/// Options shared by every command that works on a project.
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Project root containing config.xml (defaults to the current directory)
    #[arg(long, global = true, value_name = "DIR", env = "CUSTOM_CONFIG_PROJECT_ROOT")]
    pub project_root: Option<PathBuf>,

    /// Plugin id; names the backup directory plugins/<id>/backup
    #[arg(
        long,
        global = true,
        value_name = "ID",
        env = "CUSTOM_CONFIG_PLUGIN_ID",
        default_value = DEFAULT_PLUGIN_ID
    )]
    pub plugin_id: String,

    /// Platform to process; repeat for several (defaults to every installed platform)
    #[arg(long = "platform", global = true, value_name = "NAME")]
    pub platforms: Vec<String>,

    /// Lifecycle stage this run represents
    #[arg(long, global = true, value_name = "STAGE", default_value = DEFAULT_HOOK)]
    pub hook: String,
}

impl RunArgs {
    pub fn options(&self) -> Result<RunOptions> {
        let project_root = match &self.project_root {
            Some(root) => root.clone(),
            None => std::env::current_dir()?,
        };
        let mut options = RunOptions::new(project_root);
        options.plugin_id = self.plugin_id.clone();
        options.platforms = self.platforms.clone();
        options.hook = self.hook.clone();
        Ok(options)
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Restore backups, then merge config.xml into every selected platform
    Apply(commands::apply::ApplyArgs),

    /// Copy backed-up artifacts back over the live platform files
    Restore(commands::restore::RestoreArgs),

    /// Show the resolved merge items without touching any file
    Plan(commands::plan::PlanArgs),

    /// Generate shell completion scripts
    Completions(commands::completions::CompletionsArgs),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        let output = OutputConfig::from_env_and_flag(&self.color);
        let level = if self.verbose {
            LevelFilter::Debug
        } else {
            logging::parse_level(&self.log_level)
        };
        logging::init(&self.run.plugin_id, level, &output);

        match self.command {
            Commands::Apply(args) => commands::apply::execute(args, &self.run, &output),
            Commands::Restore(args) => commands::restore::execute(args, &self.run, &output),
            Commands::Plan(args) => commands::plan::execute(args, &self.run),
            Commands::Completions(args) => commands::completions::execute(args),
        }
    }
}
