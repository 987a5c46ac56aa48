//! CLI argument definitions

use clap::{Args, Parser, Subcommand};
use crypto_scout_domain::Section;
use std::path::PathBuf;

/// crypto-scout: research posts about early-stage crypto projects, without repeats
#[derive(Parser, Debug)]
#[command(name = "crypto-scout")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Pick a project, draft a post, and publish it
    Run(RunArgs),

    /// One-shot draft for a given project
    Draft(DraftArgs),

    /// Inspect the run state document
    State(StateArgs),

    /// Configuration management
    Config(ConfigArgs),

    /// Validate configuration and show status
    Doctor(DoctorArgs),
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Run in dry-run mode (no actual publishing)
    #[arg(long)]
    pub dry_run: bool,

    /// Keep running on the daemon interval until Ctrl+C
    #[arg(long)]
    pub daemon: bool,

    /// Write posts to outbox file for review instead of publishing
    #[arg(long)]
    pub require_approval: bool,

    /// Path to outbox file (used with --require-approval)
    #[arg(long)]
    pub outbox: Option<PathBuf>,

    /// Override the state file path
    #[arg(long)]
    pub state: Option<PathBuf>,

    /// Run this section instead of the one scheduled for the current hour
    #[arg(long)]
    pub section: Option<Section>,
}

#[derive(Args, Debug)]
pub struct DraftArgs {
    /// Project name
    #[arg(long)]
    pub name: String,

    /// Project ticker
    #[arg(long, default_value = "")]
    pub symbol: String,

    /// Project page URL
    #[arg(long, default_value = "")]
    pub url: String,

    /// Section the project was found in
    #[arg(long, default_value = "new")]
    pub section: Section,

    /// State file checked for duplicate text
    #[arg(long)]
    pub state: Option<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct StateArgs {
    #[command(subcommand)]
    pub command: StateCommands,
}

#[derive(Subcommand, Debug)]
pub enum StateCommands {
    /// Print the state document
    Show {
        /// Override the state file path
        #[arg(long)]
        state: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Generate example configuration file
    Init {
        /// Path to write config file
        #[arg(long, default_value = "./config.toml")]
        path: PathBuf,

        /// Overwrite existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Args, Debug)]
pub struct DoctorArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}
