//! Error types for yq-engine

use std::fmt;
use thiserror::Error;
use yq_core::{CoreError, Version};
use yq_db::DbError;
use yq_sql::SqlError;

/// Broad classification of an engine error, for callers that branch on the
/// kind of failure rather than the exact variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad or missing settings; raised before any database I/O
    Configuration,
    /// Database unreachable, missing or not creatable
    Connectivity,
    /// Malformed or duplicate version directories
    VersionResolution,
    /// A script or metadata statement failed on the server
    ScriptExecution,
    /// The platform lacks a capability the operation needs
    Capability,
    /// Workspace files could not be read or written
    Workspace,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Configuration => "configuration",
            ErrorKind::Connectivity => "connectivity",
            ErrorKind::VersionResolution => "version resolution",
            ErrorKind::ScriptExecution => "script execution",
            ErrorKind::Capability => "capability",
            ErrorKind::Workspace => "workspace",
        };
        f.write_str(name)
    }
}

/// Where and why a script failed
#[derive(Debug)]
pub struct ScriptFailure {
    /// Version being applied; `None` for run-level buckets such as `_init`
    pub version: Option<Version>,
    /// Workspace-relative script path, e.g. `v1.00/02_tables.sql`
    pub script: String,
    /// Statement that failed, when the failure came from a batch
    pub statement: Option<String>,
    /// 1-based batch number within the script
    pub batch_no: Option<u32>,
    pub error: DbError,
}

impl fmt::Display for ScriptFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}'", self.script)?;
        if let Some(version) = &self.version {
            write!(f, " in {}", version)?;
        }
        if let Some(batch_no) = self.batch_no {
            write!(f, " (batch {})", batch_no)?;
        }
        write!(f, ": {}", self.error)
    }
}

/// Engine error type
#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Db(#[from] DbError),

    #[error(transparent)]
    Sql(#[from] SqlError),

    /// M001: Target database missing and auto-create not requested
    #[error("[M001] Database '{database}' does not exist (use --autocreate-db to create it)")]
    DatabaseNotFound { database: String },

    /// M002: A script failed while applying
    #[error("[M002] Script failed {0}")]
    ScriptFailed(Box<ScriptFailure>),

    /// M003: Resuming a non-transactional run that stopped on a failed script
    #[error("[M003] Version {version} previously failed at '{script}'; fix the database and rerun with --continue-after-failure")]
    PreviousFailure { version: Version, script: String },

    /// M004: Rebase with no applied versions
    #[error("[M004] Nothing to rebase: no versions have been applied")]
    NothingToRebase,

    /// M005: JSON serialization error
    #[error("[M005] JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for EngineError
pub type EngineResult<T> = Result<T, EngineError>;

impl EngineError {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::Core(err) => core_kind(err),
            EngineError::Db(err) => db_kind(err),
            EngineError::Sql(_) => ErrorKind::Configuration,
            EngineError::DatabaseNotFound { .. } => ErrorKind::Connectivity,
            EngineError::ScriptFailed(_) | EngineError::PreviousFailure { .. } => {
                ErrorKind::ScriptExecution
            }
            EngineError::NothingToRebase => ErrorKind::VersionResolution,
            EngineError::Json(_) => ErrorKind::Workspace,
        }
    }

    /// The script failure carried by this error, if any
    pub fn script_failure(&self) -> Option<&ScriptFailure> {
        match self {
            EngineError::ScriptFailed(failure) => Some(failure),
            _ => None,
        }
    }
}

fn core_kind(err: &CoreError) -> ErrorKind {
    match err {
        CoreError::ConfigNotFound { .. }
        | CoreError::ConfigParseError { .. }
        | CoreError::ConfigInvalid { .. }
        | CoreError::WorkspaceNotFound { .. }
        | CoreError::YamlParse(_) => ErrorKind::Configuration,
        CoreError::InvalidVersionFormat { .. }
        | CoreError::DuplicateVersion { .. }
        | CoreError::NoVersions { .. } => ErrorKind::VersionResolution,
        CoreError::InvalidRecord { .. } => ErrorKind::ScriptExecution,
        CoreError::Io(_) | CoreError::IoWithPath { .. } | CoreError::Json(_) => {
            ErrorKind::Workspace
        }
    }
}

fn db_kind(err: &DbError) -> ErrorKind {
    match err {
        DbError::ConnectionError(_) | DbError::MutexPoisoned(_) => ErrorKind::Connectivity,
        DbError::InvalidConnectionString { .. } | DbError::UnsupportedPlatform { .. } => {
            ErrorKind::Configuration
        }
        DbError::Sql(_) | DbError::BulkImport { .. } => ErrorKind::ScriptExecution,
        DbError::NotImplemented { .. } | DbError::CapabilityNotSupported { .. } => {
            ErrorKind::Capability
        }
    }
}

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;
