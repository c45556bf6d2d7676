//! Rebase command implementation

use anyhow::Result;

use crate::cli::{GlobalArgs, RebaseArgs};
use crate::commands::common::{build_engine, classify, session_layer};

/// Execute the rebase command
pub(crate) async fn execute(args: &RebaseArgs, global: &GlobalArgs) -> Result<()> {
    let engine = build_engine(session_layer(global, &args.connection))?;
    let report = engine
        .rebase()
        .await
        .map_err(|err| classify(err, "Rebase failed"))?;

    let versions: Vec<String> = report.consolidated.iter().map(|v| v.to_string()).collect();
    println!("Consolidated {} into v0.00", versions.join(", "));
    for file in &report.baseline_files {
        println!("  v0.00/{}", file);
    }
    println!("Archived originals to {}", report.archive_dir.display());
    Ok(())
}
