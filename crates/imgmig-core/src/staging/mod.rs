//! Staging store: local copies of source assets and their transfer state.
//!
//! Per record id the state moves `absent -> staged -> transferred` and never
//! back. The directory implementation encodes state in the file name (the
//! transferred marker suffix), so the directory alone is the resume ledger.

mod dir;
pub mod name;

use std::io;
use std::path::{Path, PathBuf};

use crate::record::Record;

pub use dir::{DirStore, Inventory, PARTIAL_DIR};
pub use name::{ParsedName, DELIMITER, TRANSFERRED_SUFFIX};

/// A staged file that has not been uploaded yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedAsset {
    pub path: PathBuf,
    pub date: String,
    pub id: String,
    pub filename: String,
}

/// Result of scanning for upload candidates.
#[derive(Debug, Clone, Default)]
pub struct StagingScan {
    /// Upload candidates, in processing order.
    pub assets: Vec<StagedAsset>,
    /// Untransferred entries whose names do not follow the scheme.
    pub unrecognized: Vec<String>,
}

/// Storage contract the downloader, uploader, and driver depend on.
pub trait StagingStore {
    /// Path of the staged or transferred copy of `record`, if either exists.
    fn resolve_existing(&self, record: &Record) -> io::Result<Option<PathBuf>>;

    /// Persist `bytes` under the canonical staged name and return its path.
    fn write(&self, record: &Record, bytes: &[u8]) -> io::Result<PathBuf>;

    /// Staged files without the transferred marker.
    fn list_untransferred(&self) -> io::Result<StagingScan>;

    /// Record a confirmed upload. Must be called at most once per path.
    fn mark_transferred(&self, path: &Path) -> io::Result<PathBuf>;
}
