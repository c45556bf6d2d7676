//! Vnext command implementation

use anyhow::{Context, Result};
use yq_core::VersionStore;

use crate::cli::{GlobalArgs, VnextArgs};
use crate::commands::common::workspace_path;

/// Execute the vnext command
pub(crate) async fn execute(args: &VnextArgs, global: &GlobalArgs) -> Result<()> {
    let store = VersionStore::open(workspace_path(global)).context("Failed to open workspace")?;
    let template = args.file.as_deref();
    let next = if args.major {
        store.increment_major(template)
    } else {
        store.increment_minor(template)
    }
    .context("Failed to create the next version")?;

    println!("Created {}", store.root().join(next.to_string()).display());
    Ok(())
}
