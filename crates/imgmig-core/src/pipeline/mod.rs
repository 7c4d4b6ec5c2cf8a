//! Migration driver.
//!
//! Two sequential phases with no overlap: download every catalog record into
//! the staging store, then re-scan the store and upload every untransferred
//! file. The upload phase never looks at download results, so a run can pick
//! up after any earlier partial run. Failures of one record or file are
//! logged, recorded in the report, and the next item proceeds.

mod report;

pub use report::{
    DownloadReport, MigrationReport, Phase, Progress, ProgressSender, RunAborted, UploadReport,
};

use crate::downloader::{DownloadOutcome, Downloader, FetchTransport};
use crate::error::MigrationError;
use crate::record::Record;
use crate::staging::StagingStore;
use crate::uploader::{UploadTransport, Uploader};

fn emit(progress: Option<&ProgressSender>, phase: Phase, done: usize, total: usize, subject: &str) {
    if let Some(tx) = progress {
        // A closed receiver only means nobody is watching.
        let _ = tx.blocking_send(Progress {
            phase,
            done,
            total,
            subject: subject.to_string(),
        });
    }
}

/// Phase 1: ensure every record has a staged copy, in catalog order.
///
/// Sends progress with `blocking_send`; call from a blocking thread.
pub fn run_download_phase<S, F>(
    store: &S,
    fetcher: F,
    records: &[Record],
    progress: Option<&ProgressSender>,
) -> DownloadReport
where
    S: StagingStore + ?Sized,
    F: FetchTransport,
{
    let total = records.len();
    let mut report = DownloadReport {
        total,
        ..DownloadReport::default()
    };
    let mut downloader = Downloader::new(store, fetcher);

    for (i, record) in records.iter().enumerate() {
        match downloader.ensure_staged(record) {
            DownloadOutcome::AlreadyStaged(_) => report.already_staged += 1,
            DownloadOutcome::Fetched(_) => report.fetched += 1,
            DownloadOutcome::NotFound => {}
            DownloadOutcome::Failed(e) => {
                tracing::warn!("download {}/{} failed: {}", i + 1, total, e);
                report.failures.push(e);
            }
        }
        tracing::info!("Download {}/{}", i + 1, total);
        emit(progress, Phase::Download, i + 1, total, &record.id);
    }

    report.not_found = downloader.into_not_found();
    tracing::info!(
        "download phase done: {} fetched, {} already staged, {} not found, {} failed",
        report.fetched,
        report.already_staged,
        report.not_found.len(),
        report.failures.len()
    );
    report
}

/// Phase 2: upload every staged, untransferred file and mark it transferred.
///
/// Only an unreadable staging directory fails the phase as a whole.
pub fn run_upload_phase<S, T>(
    store: &S,
    uploader: &Uploader<T>,
    progress: Option<&ProgressSender>,
) -> Result<UploadReport, MigrationError>
where
    S: StagingStore + ?Sized,
    T: UploadTransport,
{
    let scan = store
        .list_untransferred()
        .map_err(|e| MigrationError::transfer("staging directory", e))?;
    for name in &scan.unrecognized {
        tracing::debug!("{}", MigrationError::NameParse { name: name.clone() });
    }

    let total = scan.assets.len();
    let mut report = UploadReport {
        total,
        skipped: scan.unrecognized,
        ..UploadReport::default()
    };

    for (i, asset) in scan.assets.iter().enumerate() {
        match uploader.transfer(asset) {
            Ok(_) => match store.mark_transferred(&asset.path) {
                Ok(_) => report.uploaded += 1,
                Err(e) => {
                    tracing::warn!("{} uploaded but could not be marked transferred: {}", asset.id, e);
                    report.failures.push(MigrationError::transfer(&asset.id, e));
                }
            },
            Err(e) => {
                tracing::warn!("upload {}/{} failed: {}", i + 1, total, e);
                report.failures.push(e);
            }
        }
        tracing::info!("Upload {}/{}", i + 1, total);
        emit(progress, Phase::Upload, i + 1, total, &asset.id);
    }

    tracing::info!(
        "upload phase done: {} of {} uploaded, {} failed, {} skipped",
        report.uploaded,
        total,
        report.failures.len(),
        report.skipped.len()
    );
    Ok(report)
}

/// Both phases back to back over an already enumerated catalog.
///
/// If the upload phase cannot start, the error carries the download report.
pub fn run<S, F, T>(
    store: &S,
    records: &[Record],
    fetcher: F,
    uploader: &Uploader<T>,
    progress: Option<&ProgressSender>,
) -> Result<MigrationReport, RunAborted>
where
    S: StagingStore + ?Sized,
    F: FetchTransport,
    T: UploadTransport,
{
    let download = run_download_phase(store, fetcher, records, progress);
    match run_upload_phase(store, uploader, progress) {
        Ok(upload) => Ok(MigrationReport { download, upload }),
        Err(source) => {
            tracing::error!(
                "upload phase aborted after download ({} not found): {}",
                download.not_found.len(),
                source
            );
            for url in &download.not_found {
                tracing::warn!("not found at source: {}", url);
            }
            Err(RunAborted { download, source })
        }
    }
}
