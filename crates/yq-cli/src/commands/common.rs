//! Shared utilities for CLI commands

use anyhow::{Context, Result};
use std::fmt;
use std::path::PathBuf;
use yq_core::config::parse_token;
use yq_core::{Config, ConfigLayer, TransactionMode, Version};
use yq_db::PlatformRegistry;
use yq_engine::{EngineError, ErrorKind, MigrationEngine};

use crate::cli::{ConnectionArgs, GlobalArgs, RunArgs};

/// Exit code for configuration and usage errors
pub(crate) const EXIT_CONFIG: i32 = 1;

/// Exit code for a failed migration, verify or maintenance command
pub(crate) const EXIT_FAILED: i32 = 2;

/// Error type representing a non-zero process exit code.
///
/// Use `return Err(ExitCode(N).into())` instead of `std::process::exit(N)`
/// so that RAII destructors run and cleanup happens properly.
#[derive(Debug)]
pub(crate) struct ExitCode(pub(crate) i32);

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Empty: main prints nothing for this error
        write!(f, "")
    }
}

impl std::error::Error for ExitCode {}

/// Session configuration layer from the global and connection flags
pub(crate) fn session_layer(global: &GlobalArgs, conn: &ConnectionArgs) -> ConfigLayer {
    ConfigLayer {
        platform: conn.platform.clone(),
        connection_string: conn.connection_string.clone(),
        workspace: global.path.clone(),
        meta_schema: conn.meta_schema.clone(),
        meta_table: conn.meta_table.clone(),
        command_timeout: conn.command_timeout,
        ..ConfigLayer::default()
    }
}

/// Session layer for run and verify, which add the migration flags
pub(crate) fn run_layer(global: &GlobalArgs, args: &RunArgs) -> Result<ConfigLayer> {
    let mut layer = session_layer(global, &args.connection);
    if let Some(raw) = &args.target_version {
        layer.target_version = Some(Version::parse(raw).context("Invalid --target-version")?);
    }
    if let Some(raw) = &args.transaction_mode {
        layer.transaction_mode = Some(
            raw.parse::<TransactionMode>()
                .context("Invalid --transaction-mode")?,
        );
    }
    // absent flags must not override lower layers
    layer.auto_create_db = args.autocreate_db.then_some(true);
    layer.continue_after_failure = args.continue_after_failure.then_some(true);
    layer.delimiter = args.delimiter.clone();
    layer.tokens = args
        .tokens
        .iter()
        .map(|raw| parse_token(raw))
        .collect::<Result<_, _>>()
        .context("Invalid --token")?;
    Ok(layer)
}

/// Workspace directory for commands that only touch the filesystem
pub(crate) fn workspace_path(global: &GlobalArgs) -> PathBuf {
    global
        .path
        .clone()
        .or_else(|| std::env::var_os(yq_core::config::env::WORKSPACE).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Resolve configuration and build an engine for the configured platform
pub(crate) fn build_engine(layer: ConfigLayer) -> Result<MigrationEngine> {
    let config = Config::discover(layer).context("Failed to load configuration")?;
    log::debug!(
        "Platform '{}', workspace {}",
        config.platform,
        config.workspace.display()
    );
    MigrationEngine::from_registry(config, &PlatformRegistry::with_defaults())
        .map_err(|err| classify(err, "Failed to create engine"))
}

/// Map an engine error onto the process exit code.
///
/// Configuration problems keep exit code 1 through anyhow's chain; anything
/// else is printed here and exits with 2.
pub(crate) fn classify(err: EngineError, action: &str) -> anyhow::Error {
    if err.kind() == ErrorKind::Configuration {
        return anyhow::Error::new(err).context(action.to_string());
    }
    eprintln!("Error: {}: {} ({})", action, err, err.kind());
    if let Some(failure) = err.script_failure() {
        if let Some(statement) = &failure.statement {
            eprintln!("Failed statement:\n{}", statement);
        }
    }
    ExitCode(EXIT_FAILED).into()
}

#[cfg(test)]
#[path = "common_test.rs"]
mod tests;
