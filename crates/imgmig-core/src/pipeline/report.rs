//! Per-phase tallies and progress events.

use crate::error::MigrationError;

/// Which phase a progress event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Download,
    Upload,
}

/// Emitted after each item is handled (`done` of `total`).
#[derive(Debug, Clone)]
pub struct Progress {
    pub phase: Phase,
    pub done: usize,
    pub total: usize,
    /// Record id of the item just handled.
    pub subject: String,
}

/// Channel the CLI listens on; the pipeline sends with `blocking_send`.
pub type ProgressSender = tokio::sync::mpsc::Sender<Progress>;

/// Outcome of the download phase.
#[derive(Debug, Default)]
pub struct DownloadReport {
    pub total: usize,
    pub fetched: usize,
    pub already_staged: usize,
    /// Urls that answered 404, in catalog order.
    pub not_found: Vec<String>,
    pub failures: Vec<MigrationError>,
}

/// Outcome of the upload phase.
#[derive(Debug, Default)]
pub struct UploadReport {
    pub total: usize,
    pub uploaded: usize,
    pub failures: Vec<MigrationError>,
    /// Entries skipped because their names do not follow the staging scheme.
    pub skipped: Vec<String>,
}

/// Upload phase could not start; the finished download tallies are kept.
#[derive(Debug, thiserror::Error)]
#[error("{source}")]
pub struct RunAborted {
    pub download: DownloadReport,
    #[source]
    pub source: MigrationError,
}

/// Both phases of one run.
#[derive(Debug, Default)]
pub struct MigrationReport {
    pub download: DownloadReport,
    pub upload: UploadReport,
}

impl DownloadReport {
    /// Records that now have a local copy.
    pub fn staged(&self) -> usize {
        self.fetched + self.already_staged
    }
}

impl MigrationReport {
    pub fn failure_count(&self) -> usize {
        self.download.failures.len() + self.upload.failures.len()
    }
}
