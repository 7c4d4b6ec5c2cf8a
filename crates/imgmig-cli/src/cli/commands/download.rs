//! `imgmig download` – stage every catalog record without uploading.

use anyhow::{Context, Result};
use imgmig_core::config::MigrateConfig;
use imgmig_core::http::HttpClient;
use imgmig_core::pipeline::{self, DownloadReport};

use super::shared::{enumerate_catalog, open_store, print_download_summary, spawn_progress_printer};

pub async fn run_download(cfg: &MigrateConfig) -> Result<()> {
    cfg.require_source()?;
    let store = open_store(cfg)?;
    let (progress_tx, progress_handle) = spawn_progress_printer();

    let report = tokio::task::spawn_blocking({
        let cfg = cfg.clone();
        move || -> Result<DownloadReport> {
            let records = enumerate_catalog(&cfg)?;
            let fetcher = HttpClient::new(&cfg.http);
            Ok(pipeline::run_download_phase(&store, fetcher, &records, Some(&progress_tx)))
        }
    })
    .await
    .context("download task join")??;

    let _ = progress_handle.await;
    print_download_summary(&report);
    Ok(())
}
