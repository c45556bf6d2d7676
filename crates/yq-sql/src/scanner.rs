//! Comment and quoted-literal spans
//!
//! The scanner walks raw SQL once and records every region where a batch
//! separator must not be recognised: `--` line comments, `/* */` block
//! comments (non-nesting; the first `*/` closes), `'...'` string literals with
//! the `''` escape, `"..."` quoted identifiers with the `""` escape and
//! `$tag$...$tag$` bodies. A `$` inside an identifier never opens a tag.
//! Anything left open runs to the end of input.

use serde::Serialize;

/// What a span covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SpanKind {
    LineComment,
    BlockComment,
    StringLiteral,
    QuotedIdentifier,
    DollarQuoted,
}

impl SpanKind {
    /// Comments carry no executable content
    pub fn is_comment(&self) -> bool {
        matches!(self, SpanKind::LineComment | SpanKind::BlockComment)
    }
}

/// Byte range `[start, end)` in the scanned text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub kind: SpanKind,
}

impl Span {
    /// Text of the span within the text it was scanned from
    pub fn text<'a>(&self, raw: &'a str) -> &'a str {
        &raw[self.start..self.end]
    }

    pub fn contains(&self, offset: usize) -> bool {
        self.start <= offset && offset < self.end
    }
}

/// Scan `raw` and return ordered, non-overlapping spans.
pub fn scan(raw: &str) -> Vec<Span> {
    let bytes = raw.as_bytes();
    let len = bytes.len();
    let mut spans = Vec::new();
    let mut i = 0;

    while i < len {
        let next = bytes.get(i + 1).copied();
        let (kind, end) = match (bytes[i], next) {
            (b'-', Some(b'-')) => {
                let end = find_byte(bytes, i + 2, b'\n').unwrap_or(len);
                (SpanKind::LineComment, end)
            }
            (b'/', Some(b'*')) => {
                let end = find_seq(bytes, i + 2, b"*/").map_or(len, |p| p + 2);
                (SpanKind::BlockComment, end)
            }
            (b'\'', _) => (SpanKind::StringLiteral, quoted_end(bytes, i, b'\'')),
            (b'"', _) => (SpanKind::QuotedIdentifier, quoted_end(bytes, i, b'"')),
            (b'$', _) if !follows_identifier(bytes, i) => match dollar_tag_end(bytes, i) {
                Some(tag_end) => {
                    let tag = &bytes[i..tag_end];
                    let end = find_seq(bytes, tag_end, tag).map_or(len, |p| p + tag.len());
                    (SpanKind::DollarQuoted, end)
                }
                None => {
                    i += 1;
                    continue;
                }
            },
            _ => {
                i += 1;
                continue;
            }
        };
        spans.push(Span {
            start: i,
            end,
            kind,
        });
        i = end;
    }
    spans
}

/// Whether `offset` falls inside any span.
///
/// `spans` must be ordered and non-overlapping, as returned by [`scan`].
pub fn contains(spans: &[Span], offset: usize) -> bool {
    let idx = spans.partition_point(|s| s.start <= offset);
    idx > 0 && spans[idx - 1].contains(offset)
}

/// Whether `raw` holds anything besides whitespace and comments.
pub fn has_executable_content(raw: &str) -> bool {
    let spans = scan(raw);
    let mut comments = spans.iter().filter(|s| s.kind.is_comment()).peekable();
    let mut pos = 0;
    while pos < raw.len() {
        if let Some(span) = comments.peek() {
            if span.start <= pos {
                pos = pos.max(span.end);
                comments.next();
                continue;
            }
        }
        let stop = comments.peek().map_or(raw.len(), |s| s.start);
        if raw[pos..stop].chars().any(|c| !c.is_whitespace()) {
            return true;
        }
        pos = stop;
    }
    false
}

fn find_byte(bytes: &[u8], from: usize, needle: u8) -> Option<usize> {
    bytes[from.min(bytes.len())..]
        .iter()
        .position(|&b| b == needle)
        .map(|p| p + from)
}

fn find_seq(bytes: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || from >= bytes.len() {
        return None;
    }
    bytes[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|p| p + from)
}

/// End (exclusive) of a literal opened at `start` by `quote`, where a doubled
/// quote is an escaped quote.
fn quoted_end(bytes: &[u8], start: usize, quote: u8) -> usize {
    let mut j = start + 1;
    while j < bytes.len() {
        if bytes[j] == quote {
            if bytes.get(j + 1) == Some(&quote) {
                j += 2;
                continue;
            }
            return j + 1;
        }
        j += 1;
    }
    bytes.len()
}

/// Whether the byte before `pos` continues an identifier (`sys$x`, `a1$`)
fn follows_identifier(bytes: &[u8], pos: usize) -> bool {
    pos > 0 && {
        let b = bytes[pos - 1];
        b == b'_' || b == b'$' || b.is_ascii_alphanumeric() || !b.is_ascii()
    }
}

/// If a `$tag$` opener starts at `start`, return the offset just past it.
///
/// The tag is empty or an identifier that does not start with a digit, so
/// positional parameters (`$1`) and `${TOKEN}` placeholders never open one.
fn dollar_tag_end(bytes: &[u8], start: usize) -> Option<usize> {
    let mut j = start + 1;
    while j < bytes.len() {
        let b = bytes[j];
        if b == b'$' {
            return Some(j + 1);
        }
        let valid = b == b'_' || b.is_ascii_alphabetic() || (j > start + 1 && b.is_ascii_digit());
        if !valid {
            return None;
        }
        j += 1;
    }
    None
}

#[cfg(test)]
#[path = "scanner_test.rs"]
mod tests;
