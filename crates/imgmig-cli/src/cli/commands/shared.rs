//! Pieces shared by the phase commands: wiring config into the core, progress and summaries.

use anyhow::{Context, Result};
use imgmig_core::catalog::CatalogClient;
use imgmig_core::config::MigrateConfig;
use imgmig_core::http::HttpClient;
use imgmig_core::pipeline::{DownloadReport, Phase, Progress, ProgressSender, UploadReport};
use imgmig_core::staging::DirStore;
use imgmig_core::uploader::{MediaServer, Uploader};
use imgmig_core::Record;
use tokio::task::JoinHandle;

pub(super) fn open_store(cfg: &MigrateConfig) -> Result<DirStore> {
    DirStore::open(&cfg.staging_dir, cfg.name_timezone)
        .with_context(|| format!("open staging dir: {}", cfg.staging_dir.display()))
}

pub(super) fn build_uploader(cfg: &MigrateConfig) -> Result<Uploader<MediaServer>> {
    let dest = cfg.require_destination()?;
    let media = MediaServer::new(HttpClient::new(&cfg.http), &dest);
    Ok(Uploader::new(media, cfg.transient_dir()))
}

/// Authenticate and enumerate the whole catalog. Blocking; run inside `spawn_blocking`.
pub(super) fn enumerate_catalog(cfg: &MigrateConfig) -> Result<Vec<Record>> {
    let source = cfg.require_source()?;
    let client = CatalogClient::new(HttpClient::new(&cfg.http), source.endpoint);
    let session = client.login(&source.username, &source.password)?;
    let records = session.list_all_records(cfg.page_size)?;
    println!("Catalog lists {} image(s).", records.len());
    Ok(records)
}

/// Prints `Download i/total` / `Upload i/total` lines as the pipeline reports them.
pub(super) fn spawn_progress_printer() -> (ProgressSender, JoinHandle<()>) {
    let (tx, mut rx) = tokio::sync::mpsc::channel::<Progress>(64);
    let handle = tokio::spawn(async move {
        while let Some(p) = rx.recv().await {
            let label = match p.phase {
                Phase::Download => "Download",
                Phase::Upload => "Upload",
            };
            println!("{} {}/{}  {}", label, p.done, p.total, p.subject);
        }
    });
    (tx, handle)
}

pub(super) fn print_download_summary(report: &DownloadReport) {
    println!(
        "Download phase: {} fetched, {} already staged, {} not found, {} failed (of {}).",
        report.fetched,
        report.already_staged,
        report.not_found.len(),
        report.failures.len(),
        report.total
    );
    if !report.not_found.is_empty() {
        println!("Not found at source:");
        for url in &report.not_found {
            println!("  {}", url);
        }
    }
    for e in &report.failures {
        println!("  failed: {}", e);
    }
}

pub(super) fn print_upload_summary(report: &UploadReport) {
    println!(
        "Upload phase: {} uploaded, {} failed (of {}); {} unrelated file(s) skipped.",
        report.uploaded,
        report.failures.len(),
        report.total,
        report.skipped.len()
    );
    for e in &report.failures {
        println!("  failed: {}", e);
    }
    if !report.failures.is_empty() {
        println!("Failed uploads stay staged; rerun `imgmig upload` to retry them.");
    }
}
