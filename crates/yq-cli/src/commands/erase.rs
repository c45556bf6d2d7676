//! Erase command implementation

use anyhow::Result;

use crate::cli::{EraseArgs, GlobalArgs};
use crate::commands::common::{build_engine, classify, session_layer};

/// Execute the erase command
pub(crate) async fn execute(args: &EraseArgs, global: &GlobalArgs) -> Result<()> {
    let engine = build_engine(session_layer(global, &args.connection))?;
    let report = engine
        .erase(args.force)
        .await
        .map_err(|err| classify(err, "Erase failed"))?;

    if report.scripts.is_empty() {
        println!("No _erase scripts found");
        return Ok(());
    }
    for script in &report.scripts {
        println!("  {}", script);
    }
    if !report.dry_run {
        println!("\nErased database with {} script(s)", report.scripts.len());
    } else if report.executed {
        println!("\nDry run: scripts ran and were rolled back; use --force to commit");
    } else {
        println!("\nDry run: scripts were not executed; use --force to run them");
    }
    Ok(())
}
