//! CLI argument definitions using clap derive API

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// yuniql - schema versioning and migrations with plain SQL files
#[derive(Parser, Debug)]
#[command(name = "yuniql")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all commands
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Workspace directory (default: YUNIQL_WORKSPACE or the current directory)
    #[arg(short = 'p', long, global = true)]
    pub path: Option<PathBuf>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the workspace skeleton
    Init,

    /// Create the next version directory
    Vnext(VnextArgs),

    /// Apply pending versions
    Run(RunArgs),

    /// Apply pending versions in one transaction and roll everything back
    Verify(RunArgs),

    /// Show applied versions
    #[command(alias = "info")]
    List(ListArgs),

    /// Run the _erase scripts
    Erase(EraseArgs),

    /// Fold applied versions into a new v0.00 baseline
    Rebase(RebaseArgs),

    /// List the supported platforms
    Platforms,
}

/// Database connection options shared by commands that connect
#[derive(Args, Debug, Clone, Default)]
pub struct ConnectionArgs {
    /// Target platform (duckdb, postgresql, sqlserver, ...)
    #[arg(long)]
    pub platform: Option<String>,

    /// Connection string for the target database
    #[arg(short = 'c', long)]
    pub connection_string: Option<String>,

    /// Schema holding the metadata table
    #[arg(long)]
    pub meta_schema: Option<String>,

    /// Name of the metadata table
    #[arg(long)]
    pub meta_table: Option<String>,

    /// Statement timeout in seconds
    #[arg(long)]
    pub command_timeout: Option<u64>,
}

/// Arguments for the vnext command
#[derive(Args, Debug)]
pub struct VnextArgs {
    /// Increment the major version
    #[arg(short = 'M', long, conflicts_with = "minor")]
    pub major: bool,

    /// Increment the minor version (default)
    #[arg(short = 'm', long)]
    pub minor: bool,

    /// Script file to create in the new version
    #[arg(short = 'f', long)]
    pub file: Option<PathBuf>,
}

/// Arguments for the run and verify commands
#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Create the target database when it does not exist
    #[arg(short = 'a', long)]
    pub autocreate_db: bool,

    /// Stop after this version (e.g. v1.02)
    #[arg(short = 't', long)]
    pub target_version: Option<String>,

    /// Token as KEY=VALUE (repeatable)
    #[arg(short = 'k', long = "token")]
    pub tokens: Vec<String>,

    /// Batch separator replacing the platform's own
    #[arg(long)]
    pub delimiter: Option<String>,

    /// Transaction scope: session, version or none
    #[arg(long)]
    pub transaction_mode: Option<String>,

    /// Resume a non-transactional run after the previously failed script
    #[arg(long)]
    pub continue_after_failure: bool,
}

/// Arguments for the list command
#[derive(Args, Debug)]
pub struct ListArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub output: ListOutput,
}

/// List output formats
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListOutput {
    /// Table format
    Table,
    /// JSON output
    Json,
}

/// Arguments for the erase command
#[derive(Args, Debug)]
pub struct EraseArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Commit the erase instead of a dry run
    #[arg(long)]
    pub force: bool,
}

/// Arguments for the rebase command
#[derive(Args, Debug)]
pub struct RebaseArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,
}

#[cfg(test)]
#[path = "cli_test.rs"]
mod tests;
