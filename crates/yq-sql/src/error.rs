//! Error types for yq-sql

use thiserror::Error;

/// SQL text processing errors
#[derive(Error, Debug)]
pub enum SqlError {
    /// Separator override cannot be used (S001)
    #[error("[S001] Invalid statement delimiter '{0}': it must contain at least one non-whitespace character and no line breaks")]
    InvalidDelimiter(String),
}

/// Result type alias for SqlError
pub type SqlResult<T> = Result<T, SqlError>;
