//! Rows of the metadata table

use crate::error::{CoreError, CoreResult};
use crate::version::Version;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Number of columns selected by the metadata queries, in this order:
/// sequence_id, version, applied_on_utc, applied_by_user, applied_by_tool,
/// applied_by_tool_version, status, duration_ms, checksum,
/// failed_script_path, failed_script_error, additional_artifacts.
pub const RECORD_COLUMNS: usize = 12;

/// Outcome of one version attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VersionStatus {
    Successful,
    Failed,
}

impl VersionStatus {
    /// Value stored in the status column
    pub fn as_str(&self) -> &'static str {
        match self {
            VersionStatus::Successful => "Successful",
            VersionStatus::Failed => "Failed",
        }
    }
}

impl fmt::Display for VersionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VersionStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "successful" => Ok(VersionStatus::Successful),
            "failed" => Ok(VersionStatus::Failed),
            other => Err(CoreError::InvalidRecord {
                message: format!("unknown status '{}'", other),
            }),
        }
    }
}

/// One row of the metadata table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedVersionRecord {
    pub sequence_id: i64,
    pub version: Version,
    pub applied_on_utc: DateTime<Utc>,
    pub applied_by_user: String,
    pub applied_by_tool: String,
    pub applied_by_tool_version: String,
    pub status: VersionStatus,
    pub duration_ms: i64,
    pub checksum: String,
    pub failed_script_path: Option<String>,
    pub failed_script_error: Option<String>,
    pub additional_artifacts: Option<String>,
}

impl AppliedVersionRecord {
    /// Decode a text row in [`RECORD_COLUMNS`] order.
    ///
    /// Empty strings in the optional columns are read as absent.
    pub fn from_row(row: &[Option<String>]) -> CoreResult<Self> {
        if row.len() < RECORD_COLUMNS {
            return Err(CoreError::InvalidRecord {
                message: format!(
                    "expected {} columns, got {}",
                    RECORD_COLUMNS,
                    row.len()
                ),
            });
        }
        let required = |idx: usize, name: &str| -> CoreResult<String> {
            row[idx].clone().ok_or_else(|| CoreError::InvalidRecord {
                message: format!("column '{}' is null", name),
            })
        };
        let optional = |idx: usize| -> Option<String> {
            row[idx].as_ref().filter(|v| !v.is_empty()).cloned()
        };
        let number = |idx: usize, name: &str| -> CoreResult<i64> {
            let raw = required(idx, name)?;
            raw.trim().parse::<i64>().map_err(|_| CoreError::InvalidRecord {
                message: format!("column '{}' is not an integer: '{}'", name, raw),
            })
        };

        Ok(Self {
            sequence_id: number(0, "sequence_id")?,
            version: Version::parse(&required(1, "version")?)?,
            applied_on_utc: parse_timestamp(&required(2, "applied_on_utc")?)?,
            applied_by_user: optional(3).unwrap_or_default(),
            applied_by_tool: optional(4).unwrap_or_default(),
            applied_by_tool_version: optional(5).unwrap_or_default(),
            status: required(6, "status")?.parse()?,
            duration_ms: optional(7)
                .map(|_| number(7, "duration_ms"))
                .transpose()?
                .unwrap_or(0),
            checksum: optional(8).unwrap_or_default(),
            failed_script_path: optional(9),
            failed_script_error: optional(10),
            additional_artifacts: optional(11),
        })
    }

    /// Whether the row marks the version as applied
    pub fn is_successful(&self) -> bool {
        self.status == VersionStatus::Successful
    }
}

/// Render a timestamp the way the metadata templates insert it.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M:%S%.3f").to_string()
}

/// Parse a timestamp as drivers render it in text form.
///
/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS[.fff][+zz]` and the `T`-separated
/// variant without offset (interpreted as UTC).
pub fn parse_timestamp(raw: &str) -> CoreResult<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    if let Ok(ts) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f%#z") {
        return Ok(ts.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Ok(naive.and_utc());
        }
    }
    Err(CoreError::InvalidRecord {
        message: format!("unrecognised timestamp '{}'", raw),
    })
}

/// Highest successful version by version ordering (not insertion order).
pub fn current_version(records: &[AppliedVersionRecord]) -> Option<Version> {
    records
        .iter()
        .filter(|r| r.is_successful())
        .map(|r| r.version)
        .max()
}

#[cfg(test)]
#[path = "record_test.rs"]
mod tests;
