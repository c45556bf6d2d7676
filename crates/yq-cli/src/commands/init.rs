//! Init command implementation - scaffolds a yuniql workspace

use anyhow::{Context, Result};
use yq_core::{Bucket, VersionStore};

use crate::cli::GlobalArgs;
use crate::commands::common::workspace_path;

/// Execute the init command
pub(crate) async fn execute(global: &GlobalArgs) -> Result<()> {
    let root = workspace_path(global);
    let store = VersionStore::new(&root);
    store
        .init()
        .with_context(|| format!("Failed to initialize workspace: {}", root.display()))?;

    println!("Initialized yuniql workspace at {}\n", root.display());
    for bucket in Bucket::ALL {
        println!("  {}/", bucket.dir_name());
    }
    for version in store.get_all_versions()? {
        println!("  {}/", version);
    }
    println!("\nNext steps:");
    println!("  yuniql vnext -f 01_create_tables.sql");
    println!("  yuniql run -c <connection string> -a");
    Ok(())
}
