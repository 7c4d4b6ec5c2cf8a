//! `imgmig run` – download phase then upload phase.

use anyhow::{Context, Result};
use imgmig_core::config::MigrateConfig;
use imgmig_core::http::HttpClient;
use imgmig_core::pipeline;

use super::shared::{
    build_uploader, enumerate_catalog, open_store, print_download_summary, print_upload_summary,
    spawn_progress_printer,
};

pub async fn run_migration(cfg: &MigrateConfig) -> Result<()> {
    // Fail on missing settings before touching the network.
    cfg.require_source()?;
    let uploader = build_uploader(cfg)?;
    let store = open_store(cfg)?;
    let (progress_tx, progress_handle) = spawn_progress_printer();

    let report = tokio::task::spawn_blocking({
        let cfg = cfg.clone();
        move || -> Result<pipeline::MigrationReport> {
            let records = enumerate_catalog(&cfg)?;
            let fetcher = HttpClient::new(&cfg.http);
            match pipeline::run(&store, &records, fetcher, &uploader, Some(&progress_tx)) {
                Ok(report) => Ok(report),
                Err(aborted) => {
                    print_download_summary(&aborted.download);
                    Err(aborted.source.into())
                }
            }
        }
    })
    .await
    .context("migration task join")??;

    let _ = progress_handle.await;

    print_download_summary(&report.download);
    print_upload_summary(&report.upload);
    tracing::info!(
        "run finished: {} uploaded, {} failure(s)",
        report.upload.uploaded,
        report.failure_count()
    );
    Ok(())
}
