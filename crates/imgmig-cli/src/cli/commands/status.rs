//! `imgmig status` – show what the staging directory holds.

use anyhow::{Context, Result};
use imgmig_core::config::MigrateConfig;
use imgmig_core::staging::DirStore;

pub async fn run_status(cfg: &MigrateConfig) -> Result<()> {
    let dir = &cfg.staging_dir;
    if !dir.is_dir() {
        println!("No staging directory at {}.", dir.display());
        return Ok(());
    }
    let inv = DirStore::new(dir, cfg.name_timezone)
        .inventory()
        .with_context(|| format!("scan staging dir: {}", dir.display()))?;
    println!("Staging directory: {}", dir.display());
    println!("{:<14} {}", "STATE", "COUNT");
    println!("{:<14} {}", "staged", inv.staged);
    println!("{:<14} {}", "transferred", inv.transferred);
    println!("{:<14} {}", "unrecognized", inv.unrecognized);
    if inv.partial > 0 {
        println!("{:<14} {}", "partial", inv.partial);
    }
    Ok(())
}
