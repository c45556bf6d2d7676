//! Error types for yq-db

use std::fmt;
use thiserror::Error;

/// Driver error in a platform-independent shape
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlFailure {
    /// Vendor error code (SQLSTATE, error number or error class) when known
    pub code: Option<String>,
    pub message: String,
    /// Statement that failed
    pub statement: Option<String>,
}

impl fmt::Display for SqlFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.code {
            Some(code) => write!(f, "{} ({})", self.message, code),
            None => write!(f, "{}", self.message),
        }
    }
}

/// Database operation errors
#[derive(Error, Debug)]
pub enum DbError {
    /// Connection error (D001)
    #[error("[D001] Database connection failed: {0}")]
    ConnectionError(String),

    /// Statement failed on the server (D002)
    #[error("[D002] SQL execution failed: {0}")]
    Sql(SqlFailure),

    /// Bulk load error (D004)
    #[error("[D004] Bulk import failed for {table}: {message}")]
    BulkImport { table: String, message: String },

    /// Not implemented (D005)
    #[error("[D005] Feature not implemented for {backend}: {feature}")]
    NotImplemented { backend: String, feature: String },

    /// Mutex poisoned (D006)
    #[error("[D006] Database mutex poisoned: {0}")]
    MutexPoisoned(String),

    /// Operation gated by a capability the platform lacks (D008)
    #[error("[D008] Platform '{platform}' does not support {capability}")]
    CapabilityNotSupported {
        platform: String,
        capability: String,
    },

    /// Platform name not in the registry (D009)
    #[error("[D009] Unsupported platform '{name}'. Available: {available}")]
    UnsupportedPlatform { name: String, available: String },

    /// Connection string could not be interpreted (D010)
    #[error("[D010] Invalid connection string for {platform}: {message}")]
    InvalidConnectionString { platform: String, message: String },
}

/// Result type alias for DbError
pub type DbResult<T> = Result<T, DbError>;

impl DbError {
    /// Build an execution error for `statement`
    pub fn sql(code: Option<String>, message: impl Into<String>, statement: &str) -> Self {
        DbError::Sql(SqlFailure {
            code,
            message: message.into(),
            statement: Some(statement.to_string()),
        })
    }

    /// The normalised failure, for execution errors
    pub fn sql_failure(&self) -> Option<&SqlFailure> {
        match self {
            DbError::Sql(failure) => Some(failure),
            _ => None,
        }
    }
}

/// Normalise a DuckDB error raised while running `statement`.
///
/// DuckDB has no numeric codes; its messages start with the error class
/// (`Catalog Error: ...`, `Parser Error: ...`), which is used as the code.
pub(crate) fn from_duckdb(err: duckdb::Error, statement: &str) -> DbError {
    let message = err.to_string();
    let code = message
        .split_once(" Error:")
        .map(|(class, _)| class.trim())
        .filter(|class| !class.is_empty() && !class.contains(char::is_whitespace))
        .map(str::to_string);
    DbError::sql(code, message, statement)
}
