//! Migration version identifiers (`v<major>.<minor>`)

use crate::error::{CoreError, CoreResult};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// A `major.minor` migration unit.
///
/// Ordering is total: major first, then minor. The textual form always
/// renders the minor part zero-padded to two digits (`v1.02`), while parsing
/// accepts any digit count (`v1.2` and `v1.02` are the same version).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(try_from = "String", into = "String")]
pub struct Version {
    /// Major component
    pub major: u32,
    /// Minor component
    pub minor: u32,
}

fn version_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^v(\d+)\.(\d+)$").unwrap_or_else(|e| panic!("invalid version regex: {e}"))
    })
}

impl Version {
    /// The baseline version every workspace starts from.
    pub const BASELINE: Version = Version { major: 0, minor: 0 };

    /// Create a version from its components
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// Parse a directory or metadata name such as `v1.02`.
    pub fn parse(name: &str) -> CoreResult<Self> {
        let invalid = || CoreError::InvalidVersionFormat {
            name: name.to_string(),
        };
        let caps = version_pattern().captures(name.trim()).ok_or_else(invalid)?;
        let major = caps[1].parse::<u32>().map_err(|_| invalid())?;
        let minor = caps[2].parse::<u32>().map_err(|_| invalid())?;
        Ok(Self { major, minor })
    }

    /// Whether a name is meant to be a version directory.
    ///
    /// Anything starting with a lowercase `v` followed by a digit is treated
    /// as an attempted version; if it then fails to parse it is reported
    /// instead of being silently ignored. `V1.00` is an ordinary directory.
    pub fn looks_like_version(name: &str) -> bool {
        let mut chars = name.chars();
        matches!(
            (chars.next(), chars.next()),
            (Some('v'), Some(c)) if c.is_ascii_digit()
        )
    }

    /// Next major version (minor resets to zero)
    pub fn next_major(&self) -> CoreResult<Self> {
        let major = self.major.checked_add(1).ok_or_else(|| self.exhausted("major"))?;
        Ok(Self::new(major, 0))
    }

    /// Next minor version within the same major
    pub fn next_minor(&self) -> CoreResult<Self> {
        let minor = self.minor.checked_add(1).ok_or_else(|| self.exhausted("minor"))?;
        Ok(Self::new(self.major, minor))
    }

    fn exhausted(&self, part: &str) -> CoreError {
        CoreError::ConfigInvalid {
            message: format!("{} has no next {} version", self, part),
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}.{:02}", self.major, self.minor)
    }
}

impl FromStr for Version {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Version::parse(s)
    }
}

impl TryFrom<String> for Version {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Version::parse(&value)
    }
}

impl From<Version> for String {
    fn from(value: Version) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
#[path = "version_test.rs"]
mod tests;
