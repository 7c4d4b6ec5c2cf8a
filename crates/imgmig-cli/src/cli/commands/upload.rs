//! `imgmig upload` – upload staged files only; needs no catalog access.

use anyhow::{Context, Result};
use imgmig_core::config::MigrateConfig;
use imgmig_core::pipeline::{self, UploadReport};

use super::shared::{build_uploader, open_store, print_upload_summary, spawn_progress_printer};

pub async fn run_upload(cfg: &MigrateConfig) -> Result<()> {
    let uploader = build_uploader(cfg)?;
    let store = open_store(cfg)?;
    let (progress_tx, progress_handle) = spawn_progress_printer();

    let report = tokio::task::spawn_blocking(move || -> Result<UploadReport> {
        Ok(pipeline::run_upload_phase(&store, &uploader, Some(&progress_tx))?)
    })
    .await
    .context("upload task join")??;

    let _ = progress_handle.await;
    print_upload_summary(&report);
    Ok(())
}
