use anyhow::{bail, Result};
use indexsync::SyncConfig;
use std::path::Path;

/// Write the default configuration to `path`
pub fn run_init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }

    let mut config = SyncConfig::default();
    config.service.name = Some("my-search-service".to_string());
    config.save(path)?;

    println!("Wrote default config to {}", path.display());
    println!("Set service.api_key and datasource.connection_string, or export");
    println!("INDEXSYNC_API_KEY and INDEXSYNC_CONNECTION_STRING.");
    Ok(())
}
