//! yq-sql - SQL text processing for yuniql
//!
//! Nothing in this crate parses SQL grammar. It finds comment and literal
//! spans, splits scripts into executable batches on a dialect's separator and
//! substitutes `${TOKEN}` placeholders.

pub mod error;
pub mod quote;
pub mod scanner;
pub mod splitter;
pub mod tokens;

pub use error::{SqlError, SqlResult};
pub use scanner::{has_executable_content, scan, Span, SpanKind};
pub use splitter::{split, SeparatorRule, SqlStatementBatch};
pub use tokens::{merge_tokens, replace};
