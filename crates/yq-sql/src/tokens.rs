//! `${TOKEN}` placeholder substitution
//!
//! Replacement is a single pass, case-sensitive and total: placeholders with
//! no mapping are left exactly as written.

use regex::{Captures, Regex};
use std::collections::HashMap;
use std::sync::OnceLock;

/// Tokens the engine always supplies
pub mod reserved {
    pub const DB_NAME: &str = "YUNIQL_DB_NAME";
    pub const SCHEMA_NAME: &str = "YUNIQL_SCHEMA_NAME";
    pub const TABLE_NAME: &str = "YUNIQL_TABLE_NAME";
    pub const VERSION: &str = "YUNIQL_VERSION";

    pub const APPLIED_ON_UTC: &str = "YUNIQL_APPLIED_ON_UTC";
    pub const APPLIED_BY_USER: &str = "YUNIQL_APPLIED_BY_USER";
    pub const APPLIED_BY_TOOL: &str = "YUNIQL_APPLIED_BY_TOOL";
    pub const APPLIED_BY_TOOL_VERSION: &str = "YUNIQL_APPLIED_BY_TOOL_VERSION";
    pub const STATUS: &str = "YUNIQL_STATUS";
    pub const DURATION_MS: &str = "YUNIQL_DURATION_MS";
    pub const CHECKSUM: &str = "YUNIQL_CHECKSUM";
    pub const FAILED_SCRIPT_PATH: &str = "YUNIQL_FAILED_SCRIPT_PATH";
    pub const FAILED_SCRIPT_ERROR: &str = "YUNIQL_FAILED_SCRIPT_ERROR";
    pub const ADDITIONAL_ARTIFACTS: &str = "YUNIQL_ADDITIONAL_ARTIFACTS";

    /// Every reserved key
    pub const ALL: [&str; 14] = [
        DB_NAME,
        SCHEMA_NAME,
        TABLE_NAME,
        VERSION,
        APPLIED_ON_UTC,
        APPLIED_BY_USER,
        APPLIED_BY_TOOL,
        APPLIED_BY_TOOL_VERSION,
        STATUS,
        DURATION_MS,
        CHECKSUM,
        FAILED_SCRIPT_PATH,
        FAILED_SCRIPT_ERROR,
        ADDITIONAL_ARTIFACTS,
    ];

    /// Whether a key belongs to the engine
    pub fn is_reserved(key: &str) -> bool {
        ALL.contains(&key)
    }
}

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\$\{([^}]*)\}").unwrap_or_else(|e| panic!("invalid token regex: {e}"))
    })
}

/// Substitute every `${key}` in `text`; the last mapping of a key wins.
pub fn replace(tokens: &[(String, String)], text: &str) -> String {
    if tokens.is_empty() || !text.contains("${") {
        return text.to_string();
    }
    let lookup: HashMap<&str, &str> = tokens
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();

    placeholder_pattern()
        .replace_all(text, |caps: &Captures| match lookup.get(&caps[1]) {
            Some(value) => (*value).to_string(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// Keys of placeholders that are still present in `text`
pub fn unresolved(text: &str) -> Vec<String> {
    let mut keys: Vec<String> = placeholder_pattern()
        .captures_iter(text)
        .map(|caps| caps[1].to_string())
        .collect();
    keys.sort();
    keys.dedup();
    keys
}

/// Combine engine and user tokens for one substitution pass.
///
/// Reserved entries come first. A user entry whose key is reserved is
/// dropped, so reserved placeholders always resolve to the engine's value;
/// among the remaining user entries the later mapping of a key wins.
pub fn merge_tokens(
    reserved: &[(String, String)],
    user: &[(String, String)],
) -> Vec<(String, String)> {
    let mut merged = reserved.to_vec();
    for (key, value) in user {
        if reserved.iter().any(|(k, _)| k == key) || self::reserved::is_reserved(key) {
            log::warn!("Ignoring user token '{}': the name is reserved", key);
            continue;
        }
        merged.push((key.clone(), value.clone()));
    }
    merged
}

/// Build `(key, value)` pairs from string slices
pub fn pairs<'a, I>(items: I) -> Vec<(String, String)>
where
    I: IntoIterator<Item = (&'a str, String)>,
{
    items
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

#[cfg(test)]
#[path = "tokens_test.rs"]
mod tests;
