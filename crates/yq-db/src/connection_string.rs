//! Connection string helpers
//!
//! Most dialects use ADO-style `Key=Value;Key=Value` strings; PostgreSQL and
//! Redshift also accept URLs. Only the pieces the platforms need (the
//! database name, mostly) are extracted here.

/// Parse `Key=Value;...` pairs. Keys are lower-cased and trimmed; entries
/// without `=` are skipped.
pub fn parse_pairs(raw: &str) -> Vec<(String, String)> {
    raw.split(';')
        .filter_map(|part| part.split_once('='))
        .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
        .filter(|(k, _)| !k.is_empty())
        .collect()
}

/// Value of the first of `keys` present in `pairs` (keys are lower-case)
pub fn lookup<'a>(pairs: &'a [(String, String)], keys: &[&str]) -> Option<&'a str> {
    keys.iter().find_map(|key| {
        pairs
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .filter(|v| !v.is_empty())
    })
}

/// Database segment of a `scheme://host/db?params` URL
pub fn database_from_url(raw: &str) -> Option<String> {
    let (_, rest) = raw.split_once("://")?;
    let path = rest.split_once('/')?.1;
    let db = path.split(['?', '#']).next().unwrap_or_default();
    if db.is_empty() {
        None
    } else {
        Some(db.to_string())
    }
}

/// Replace the database segment of a URL (used for master connections)
pub fn replace_url_database(raw: &str, database: &str) -> Option<String> {
    let (scheme, rest) = raw.split_once("://")?;
    let (authority, path) = match rest.split_once('/') {
        Some((authority, path)) => (authority, path),
        None => (rest, ""),
    };
    let suffix = path.find(['?', '#']).map(|i| &path[i..]).unwrap_or_default();
    Some(format!("{}://{}/{}{}", scheme, authority, database, suffix))
}
