// CLI argument definitions using Clap

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::Config;

/// Stream test-runner events to a hierarchical reporting portal
#[derive(Parser, Debug)]
#[command(name = "rp-reporter")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Report test-runner events as a launch tree", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    // Flattened so `rp-reporter events.ndjson` works without `run`.
    #[command(flatten)]
    pub run_args: RunArgs,

    /// Enable verbose debug output
    #[arg(short = 'v', long, global = true, default_value_t = false)]
    pub verbose: bool,

    /// Show current configuration and exit
    #[arg(long, default_value_t = false)]
    pub config: bool,

    /// Create default configuration file
    #[arg(long, value_name = "CONFIG_FILE")]
    pub init_config: Option<PathBuf>,

    /// Print shell completion (bash, zsh, fish, elvish, powershell)
    #[arg(long, value_name = "SHELL_TYPE", value_parser = ["bash", "zsh", "fish", "elvish", "powershell"])]
    pub completion: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Report an event stream (default)
    Run(RunArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// NDJSON event stream, `-` for stdin
    #[arg(value_name = "EVENTS", default_value = "-")]
    pub events: PathBuf,

    /// Write portal operations to this file instead of stdout
    #[arg(short = 'o', long, value_name = "OUTPUT_FILE")]
    pub output: Option<PathBuf>,

    /// Record operations in memory and print the launch tree
    #[arg(short = 'd', long, default_value_t = false)]
    pub dry_run: bool,

    /// Maximum wait for one portal operation (milliseconds)
    #[arg(long, value_name = "MS")]
    pub wait_ms: Option<u64>,

    /// Report hooks that pass
    #[arg(long, default_value_t = false)]
    pub show_passed_hooks: bool,

    /// Do not attach screenshots to failures
    #[arg(long, default_value_t = false)]
    pub no_screenshots: bool,

    /// Directory screenshots are picked up from
    #[arg(long, value_name = "DIR")]
    pub screenshots_dir: Option<PathBuf>,

    /// Store attachments of the operation stream in this directory
    #[arg(long, value_name = "DIR")]
    pub attachments_dir: Option<PathBuf>,
}

impl Cli {
    /// Helper to get effective RunArgs
    pub fn get_run_args(&self) -> &RunArgs {
        match &self.command {
            Some(Commands::Run(args)) => args,
            None => &self.run_args,
        }
    }
}

impl RunArgs {
    pub fn reads_stdin(&self) -> bool {
        self.events.as_os_str() == "-"
    }

    /// Apply command-line overrides on top of the loaded configuration.
    pub fn apply_to(&self, config: &mut Config) {
        if let Some(wait_ms) = self.wait_ms {
            config.reporter.wait_time_ms = wait_ms;
        }
        if self.show_passed_hooks {
            config.reporter.show_passed_hooks = true;
        }
        if self.no_screenshots {
            config.reporter.attach_screenshots = false;
        }
        if let Some(dir) = &self.screenshots_dir {
            config.reporter.screenshots_dir = Some(dir.clone());
        }
    }
}
