//! Identifier quoting and literal escaping
//!
//! Used where identifiers come from file names or configuration rather than
//! from script text, for example bulk-load targets.

/// Quote an identifier with ANSI double quotes, doubling embedded quotes.
///
/// # Examples
/// ```
/// use yq_sql::quote::quote_ident;
/// assert_eq!(quote_ident("users"), r#""users""#);
/// assert_eq!(quote_ident(r#"my"table"#), r#""my""table""#);
/// ```
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Quote with SQL Server brackets
pub fn quote_bracketed(ident: &str) -> String {
    format!("[{}]", ident.replace(']', "]]"))
}

/// Quote with MySQL backticks
pub fn quote_backtick(ident: &str) -> String {
    format!("`{}`", ident.replace('`', "``"))
}

/// Quote an optional schema plus table with `quote`
pub fn quote_target(schema: Option<&str>, table: &str, quote: fn(&str) -> String) -> String {
    match schema {
        Some(schema) => format!("{}.{}", quote(schema), quote(table)),
        None => quote(table),
    }
}

/// Escape a value for use inside a single-quoted SQL string literal.
pub fn escape_literal(value: &str) -> String {
    value.replace('\'', "''")
}
