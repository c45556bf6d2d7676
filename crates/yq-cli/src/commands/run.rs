//! Run and verify command implementation

use anyhow::Result;
use yq_engine::RunReport;

use crate::cli::{GlobalArgs, RunArgs};
use crate::commands::common::{build_engine, classify, run_layer};

/// Execute the run command, or verify when `verify_only` is set
pub(crate) async fn execute(args: &RunArgs, global: &GlobalArgs, verify_only: bool) -> Result<()> {
    let mut engine = build_engine(run_layer(global, args)?)?;
    let (action, outcome) = if verify_only {
        ("Verify failed", engine.verify().await)
    } else {
        ("Migration failed", engine.run().await)
    };
    let report = outcome.map_err(|err| classify(err, action))?;
    print_report(&report);
    Ok(())
}

fn print_report(report: &RunReport) {
    if report.pending.is_empty() {
        println!("Database is up to date");
    }
    for applied in &report.applied {
        println!(
            "  {}  {} script(s), {} batch(es)  [{}ms]",
            applied.version, applied.scripts, applied.batches, applied.duration_ms
        );
    }

    let final_version = report
        .final_version
        .map_or_else(|| "none".to_string(), |v| v.to_string());
    if report.verify_only {
        println!(
            "\nVerified {} version(s) up to {} ({} transaction); nothing was committed",
            report.applied.len(),
            final_version,
            report.mode
        );
    } else {
        println!(
            "\nApplied {} version(s); current version {} ({} transactions)",
            report.applied.len(),
            final_version,
            report.mode
        );
    }
}
