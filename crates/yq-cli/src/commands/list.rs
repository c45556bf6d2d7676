//! List command implementation

use anyhow::{Context, Result};
use serde::Serialize;
use yq_core::AppliedVersionRecord;

use crate::cli::{GlobalArgs, ListArgs, ListOutput};
use crate::commands::common::{build_engine, classify, session_layer};

/// Row of `list` output
#[derive(Debug, Serialize)]
struct VersionInfo {
    version: String,
    status: String,
    applied_on_utc: String,
    applied_by_user: String,
    applied_by_tool: String,
    duration_ms: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    failed_script_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    failed_script_error: Option<String>,
}

impl From<&AppliedVersionRecord> for VersionInfo {
    fn from(record: &AppliedVersionRecord) -> Self {
        Self {
            version: record.version.to_string(),
            status: record.status.to_string(),
            applied_on_utc: yq_core::format_timestamp(&record.applied_on_utc),
            applied_by_user: record.applied_by_user.clone(),
            applied_by_tool: format!(
                "{} {}",
                record.applied_by_tool, record.applied_by_tool_version
            ),
            duration_ms: record.duration_ms,
            failed_script_path: record.failed_script_path.clone(),
            failed_script_error: record.failed_script_error.clone(),
        }
    }
}

/// Execute the list command
pub(crate) async fn execute(args: &ListArgs, global: &GlobalArgs) -> Result<()> {
    let engine = build_engine(session_layer(global, &args.connection))?;
    let records = engine
        .list_versions()
        .await
        .map_err(|err| classify(err, "Failed to read applied versions"))?;
    let rows: Vec<VersionInfo> = records.iter().map(VersionInfo::from).collect();

    match args.output {
        ListOutput::Table => print_table(&rows),
        ListOutput::Json => print_json(&rows)?,
    }
    Ok(())
}

fn print_table(rows: &[VersionInfo]) {
    if rows.is_empty() {
        println!("No versions applied.");
        return;
    }

    let user_width = rows
        .iter()
        .map(|r| r.applied_by_user.len())
        .max()
        .unwrap_or(4)
        .max(4);

    println!(
        "{:<8}  {:<10}  {:<23}  {:<user_width$}  {:>10}",
        "VERSION",
        "STATUS",
        "APPLIED (UTC)",
        "USER",
        "DURATION",
        user_width = user_width
    );
    println!("{}", "-".repeat(8 + 10 + 23 + user_width + 10 + 8));

    for row in rows {
        println!(
            "{:<8}  {:<10}  {:<23}  {:<user_width$}  {:>8}ms",
            row.version,
            row.status,
            row.applied_on_utc,
            row.applied_by_user,
            row.duration_ms,
            user_width = user_width
        );
        if let Some(path) = &row.failed_script_path {
            println!("          failed at {}", path);
        }
    }

    println!("\n{} version(s)", rows.len());
}

fn print_json(rows: &[VersionInfo]) -> Result<()> {
    let json = serde_json::to_string_pretty(rows).context("Failed to serialize versions")?;
    println!("{}", json);
    Ok(())
}
