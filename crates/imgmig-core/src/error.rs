//! Error taxonomy for the migration pipeline.
//!
//! `TransportError` describes what went wrong on the wire or on disk;
//! `MigrationError` says how the pipeline treats it (fatal, recorded, isolated, skipped).

use thiserror::Error;

/// Low-level failure of a single request or filesystem step.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Curl reported an error (timeout, connection reset, DNS, etc.).
    #[error("{0}")]
    Curl(#[from] curl::Error),
    /// Multipart body could not be assembled.
    #[error("multipart form: {0}")]
    Form(#[from] curl::FormError),
    /// HTTP response had a non-2xx status.
    #[error("{url} returned HTTP {status}")]
    Http { status: u32, url: String },
    /// Disk/storage step failed (disk full, permission denied, ...).
    #[error("storage: {0}")]
    Io(#[from] std::io::Error),
    /// Response body was not the JSON we expected.
    #[error("decode: {0}")]
    Decode(#[from] serde_json::Error),
    /// GraphQL answered with errors or without the requested data.
    #[error("graphql: {0}")]
    Protocol(String),
    /// Malformed URL built from config or catalog data.
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
}

impl TransportError {
    /// HTTP status code, if this is a status failure.
    pub fn status(&self) -> Option<u32> {
        match self {
            TransportError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True for an HTTP 404, the only failure the downloader treats as terminal-but-expected.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

/// How a failure affects the run.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// Authentication or a catalog page failed. Aborts the run: later phases need a complete enumeration.
    #[error("catalog unavailable ({stage}): {source}")]
    CatalogUnavailable {
        stage: String,
        #[source]
        source: TransportError,
    },
    /// The source answered 404 for an asset url. Recorded and skipped.
    #[error("asset not found: {url}")]
    AssetNotFound { url: String },
    /// Any other network or storage failure while moving one record/file. Isolated to that item.
    #[error("transfer failed for {subject}: {source}")]
    TransferTransport {
        subject: String,
        #[source]
        source: TransportError,
    },
    /// A staging entry does not follow the `<date>@@<id>@@<filename>` scheme.
    #[error("unrecognized staging entry: {name}")]
    NameParse { name: String },
}

impl MigrationError {
    pub(crate) fn catalog(stage: impl Into<String>, source: TransportError) -> Self {
        MigrationError::CatalogUnavailable {
            stage: stage.into(),
            source,
        }
    }

    pub(crate) fn transfer(subject: impl Into<String>, source: impl Into<TransportError>) -> Self {
        MigrationError::TransferTransport {
            subject: subject.into(),
            source: source.into(),
        }
    }

    /// True when the run must stop.
    pub fn is_fatal(&self) -> bool {
        matches!(self, MigrationError::CatalogUnavailable { .. })
    }
}
