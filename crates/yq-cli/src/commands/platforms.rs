//! Platforms command implementation

use anyhow::Result;
use yq_db::PlatformRegistry;

/// Execute the platforms command
pub(crate) async fn execute() -> Result<()> {
    for name in PlatformRegistry::with_defaults().names() {
        println!("{}", name);
    }
    Ok(())
}
