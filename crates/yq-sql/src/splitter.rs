//! Script → batch splitting
//!
//! Input is processed line by line. A line that matches the separator rule
//! closes the pending batch unless the matched separator lies inside a
//! comment or literal span reported by the scanner. The last pending batch is
//! emitted at end of input whether or not it was terminated.

use crate::error::{SqlError, SqlResult};
use crate::scanner;
use serde::Serialize;

/// How a dialect marks the end of a batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeparatorRule {
    /// Keyword alone on its line (case-insensitive, surrounding whitespace
    /// allowed); the line itself is dropped from the output
    WholeLine(String),
    /// Token that must be the last non-whitespace text of a line; it stays in
    /// the batch it terminates
    Trailing(String),
}

/// Where a separator was found on one line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SeparatorMatch {
    /// Byte offset of the separator within the line
    offset: usize,
    /// Whether the whole line is the separator
    strip_line: bool,
}

impl SeparatorRule {
    /// SQL Server style `GO`
    pub fn go() -> Self {
        SeparatorRule::WholeLine("GO".to_string())
    }

    /// Statement-terminating `;`
    pub fn semicolon() -> Self {
        SeparatorRule::Trailing(";".to_string())
    }

    /// Oracle SQL*Plus style `/`
    pub fn slash() -> Self {
        SeparatorRule::WholeLine("/".to_string())
    }

    /// Build a rule from a user supplied delimiter.
    ///
    /// Words (and `/`) must stand alone on their line; punctuation such as
    /// `;` or `$$` terminates the line it ends.
    pub fn from_delimiter(delimiter: &str) -> SqlResult<Self> {
        let trimmed = delimiter.trim();
        if trimmed.is_empty() || trimmed.contains('\n') || trimmed.contains('\r') {
            return Err(SqlError::InvalidDelimiter(delimiter.to_string()));
        }
        if trimmed == "/" || trimmed.chars().all(|c| c.is_alphanumeric() || c == '_') {
            Ok(SeparatorRule::WholeLine(trimmed.to_string()))
        } else {
            Ok(SeparatorRule::Trailing(trimmed.to_string()))
        }
    }

    /// The separator text
    pub fn token(&self) -> &str {
        match self {
            SeparatorRule::WholeLine(t) | SeparatorRule::Trailing(t) => t,
        }
    }

    fn find_match(&self, line: &str) -> Option<SeparatorMatch> {
        match self {
            SeparatorRule::WholeLine(keyword) => {
                let trimmed = line.trim();
                if trimmed.eq_ignore_ascii_case(keyword) {
                    let offset = line.len() - line.trim_start().len();
                    Some(SeparatorMatch {
                        offset,
                        strip_line: true,
                    })
                } else {
                    None
                }
            }
            SeparatorRule::Trailing(token) => {
                let trimmed = line.trim_end();
                if trimmed.ends_with(token.as_str()) {
                    Some(SeparatorMatch {
                        offset: trimmed.len() - token.len(),
                        strip_line: false,
                    })
                } else {
                    None
                }
            }
        }
    }
}

/// One executable unit produced from a script
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SqlStatementBatch {
    /// 1-based position within the script
    pub batch_no: u32,
    /// Batch text with trailing whitespace removed
    pub text: String,
    /// Byte offset of the first character in the raw script
    pub start_offset: usize,
    /// Byte offset just past the last character in the raw script
    pub end_offset: usize,
}

/// Split `raw` into batches on `rule`.
pub fn split(raw: &str, rule: &SeparatorRule) -> Vec<SqlStatementBatch> {
    let mut batches = Vec::new();
    if raw.is_empty() {
        return batches;
    }

    let spans = scanner::scan(raw);
    let mut batch_start = 0;
    let mut pending = false;
    let mut line_start = 0;

    for line in raw.split('\n') {
        let line_end = line_start + line.len();
        pending = true;

        if let Some(m) = rule.find_match(line) {
            if scanner::contains(&spans, line_start + m.offset) {
                log::trace!(
                    "Ignoring separator inside comment or literal at offset {}",
                    line_start + m.offset
                );
            } else {
                let batch_end = if m.strip_line { line_start } else { line_end };
                push_batch(&mut batches, raw, batch_start, batch_end);
                batch_start = (line_end + 1).min(raw.len());
                pending = false;
            }
        }
        line_start = line_end + 1;
    }

    if pending {
        push_batch(&mut batches, raw, batch_start, raw.len());
    }
    batches
}

fn push_batch(batches: &mut Vec<SqlStatementBatch>, raw: &str, start: usize, end: usize) {
    let end = end.max(start);
    let text = raw[start..end].trim_end();
    batches.push(SqlStatementBatch {
        batch_no: batches.len() as u32 + 1,
        text: text.to_string(),
        start_offset: start,
        end_offset: start + text.len(),
    });
}

#[cfg(test)]
#[path = "splitter_test.rs"]
mod tests;
