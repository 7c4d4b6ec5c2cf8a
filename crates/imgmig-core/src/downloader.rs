//! Download side: make sure a record has a staged copy.
//!
//! The staging existence check always runs before any fetch, so a record
//! already staged (or transferred) in an earlier run costs no network call.

use std::path::{Path, PathBuf};

use crate::error::{MigrationError, TransportError};
use crate::http::HttpClient;
use crate::record::Record;
use crate::staging::StagingStore;

/// Fetches asset bytes from the source.
pub trait FetchTransport {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, TransportError>;
}

impl FetchTransport for HttpClient {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, TransportError> {
        self.get(url, &[])
    }
}

/// What happened to one record.
#[derive(Debug)]
pub enum DownloadOutcome {
    /// A staged or transferred copy was already on disk; nothing fetched.
    AlreadyStaged(PathBuf),
    /// Fetched and written under the canonical staged name.
    Fetched(PathBuf),
    /// Source answered 404. The url is in the not-found list.
    NotFound,
    /// Transport or storage failure for this record only.
    Failed(MigrationError),
}

impl DownloadOutcome {
    pub fn path(&self) -> Option<&Path> {
        match self {
            DownloadOutcome::AlreadyStaged(p) | DownloadOutcome::Fetched(p) => Some(p),
            DownloadOutcome::NotFound | DownloadOutcome::Failed(_) => None,
        }
    }
}

pub struct Downloader<'a, S: StagingStore + ?Sized, F> {
    store: &'a S,
    fetcher: F,
    not_found: Vec<String>,
}

impl<'a, S: StagingStore + ?Sized, F: FetchTransport> Downloader<'a, S, F> {
    pub fn new(store: &'a S, fetcher: F) -> Self {
        Self {
            store,
            fetcher,
            not_found: Vec::new(),
        }
    }

    /// Ensure `record` has a local copy.
    pub fn ensure_staged(&mut self, record: &Record) -> DownloadOutcome {
        match self.store.resolve_existing(record) {
            Ok(Some(path)) => {
                tracing::debug!("{} already staged at {}", record.id, path.display());
                return DownloadOutcome::AlreadyStaged(path);
            }
            Ok(None) => {}
            Err(e) => return DownloadOutcome::Failed(MigrationError::transfer(&record.id, e)),
        }

        let bytes = match self.fetcher.fetch(&record.url) {
            Ok(b) => b,
            Err(e) if e.is_not_found() => {
                tracing::warn!("{}", MigrationError::AssetNotFound { url: record.url.clone() });
                self.not_found.push(record.url.clone());
                return DownloadOutcome::NotFound;
            }
            Err(e) => return DownloadOutcome::Failed(MigrationError::transfer(&record.id, e)),
        };

        match self.store.write(record, &bytes) {
            Ok(path) => {
                tracing::info!("{} downloaded ({} bytes) to {}", record.id, bytes.len(), path.display());
                DownloadOutcome::Fetched(path)
            }
            Err(e) => DownloadOutcome::Failed(MigrationError::transfer(&record.id, e)),
        }
    }

    /// Urls that answered 404 during this run.
    pub fn not_found(&self) -> &[String] {
        &self.not_found
    }

    pub fn into_not_found(self) -> Vec<String> {
        self.not_found
    }
}
