//! Error types for yq-core

use thiserror::Error;

/// Core error type for yuniql
#[derive(Error, Debug)]
pub enum CoreError {
    /// E001: Configuration file not found
    #[error("[E001] Config file not found: {path}")]
    ConfigNotFound { path: String },

    /// E002: Failed to parse configuration file
    #[error("[E002] Failed to parse config: {message}")]
    ConfigParseError { message: String },

    /// E003: Invalid configuration value
    #[error("[E003] Invalid config: {message}")]
    ConfigInvalid { message: String },

    /// E004: Workspace directory not found
    #[error("[E004] Workspace not found: {path}")]
    WorkspaceNotFound { path: String },

    /// E005: Directory name looks like a version but does not parse
    #[error("[E005] Invalid version format '{name}': expected v<major>.<minor> (e.g. v1.02)")]
    InvalidVersionFormat { name: String },

    /// E006: Two directories resolve to the same major.minor
    #[error("[E006] Duplicate version {version}: '{first}' and '{second}'")]
    DuplicateVersion {
        version: String,
        first: String,
        second: String,
    },

    /// E007: Workspace holds no version directories at all
    #[error("[E007] No version directories found in workspace: {path}")]
    NoVersions { path: String },

    /// E008: Metadata row could not be decoded
    #[error("[E008] Invalid metadata record: {message}")]
    InvalidRecord { message: String },

    /// E014: IO error
    #[error("[E014] IO error: {0}")]
    Io(#[from] std::io::Error),

    /// E016: IO error with file path context
    #[error("[E016] Failed to access '{path}': {source}")]
    IoWithPath {
        path: String,
        source: std::io::Error,
    },

    /// E015: YAML parse error
    #[error("[E015] YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for CoreError
pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    /// Wrap an IO error with the path that produced it.
    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        CoreError::IoWithPath {
            path: path.display().to_string(),
            source,
        }
    }
}
