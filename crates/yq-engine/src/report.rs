//! Engine state and operation reports

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use yq_core::{TransactionMode, Version};

/// Lifecycle of one run or verify call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineState {
    /// Nothing has touched the database yet
    Uninitialized,
    /// Connected and the metadata table exists
    Initialized,
    /// Computing pending versions
    Resolving,
    /// Executing scripts
    Applying,
    Completed,
    Failed,
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EngineState::Uninitialized => "Uninitialized",
            EngineState::Initialized => "Initialized",
            EngineState::Resolving => "Resolving",
            EngineState::Applying => "Applying",
            EngineState::Completed => "Completed",
            EngineState::Failed => "Failed",
        };
        f.write_str(name)
    }
}

/// One version applied (or verified) by a run
#[derive(Debug, Clone, Serialize)]
pub struct AppliedVersion {
    pub version: Version,
    /// Script files executed, bucket scripts included
    pub scripts: usize,
    /// Batches sent to the server
    pub batches: usize,
    pub duration_ms: i64,
    pub checksum: String,
}

/// Outcome of [`MigrationEngine::run`](crate::MigrationEngine::run) and
/// [`MigrationEngine::verify`](crate::MigrationEngine::verify)
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub state: EngineState,
    /// Versions that were pending when the run started
    pub pending: Vec<Version>,
    pub applied: Vec<AppliedVersion>,
    /// Current version once the run finished (what it would be, for verify)
    pub final_version: Option<Version>,
    pub verify_only: bool,
    pub mode: TransactionMode,
}

/// Outcome of [`MigrationEngine::erase`](crate::MigrationEngine::erase)
#[derive(Debug, Clone, Serialize)]
pub struct EraseReport {
    /// `_erase` scripts, workspace-relative, in execution order
    pub scripts: Vec<String>,
    /// Nothing was kept: either only listed or executed and rolled back
    pub dry_run: bool,
    /// Whether the scripts were sent to the database at all
    pub executed: bool,
}

/// Outcome of [`MigrationEngine::rebase`](crate::MigrationEngine::rebase)
#[derive(Debug, Clone, Serialize)]
pub struct RebaseReport {
    /// Versions folded into the new baseline
    pub consolidated: Vec<Version>,
    pub archive_dir: PathBuf,
    /// File names written into the new `v0.00`
    pub baseline_files: Vec<String>,
}
