//! Upload side: send one staged file to the destination media server.
//!
//! The staged file is copied into a fresh temporary directory first and the
//! copy is what gets posted; the directory is removed whatever the outcome.
//! Marking the original as transferred is the driver's job, after success.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::config::DestinationSettings;
use crate::error::{MigrationError, TransportError};
use crate::http::{bearer, HttpClient};
use crate::staging::StagedAsset;

/// Delivers a file plus its record id to the destination; returns the response body.
pub trait UploadTransport {
    fn send(&self, file: &Path, id: &str) -> Result<Vec<u8>, TransportError>;
}

/// `POST <endpoint>?imageId=<id>` with a multipart file part and a static bearer token.
#[derive(Debug, Clone)]
pub struct MediaServer {
    http: HttpClient,
    endpoint: String,
    auth_header: String,
    file_field: String,
    id_param: String,
}

impl MediaServer {
    pub fn new(http: HttpClient, settings: &DestinationSettings) -> Self {
        Self {
            http,
            endpoint: settings.endpoint.clone(),
            auth_header: bearer(&settings.bearer_token),
            file_field: settings.file_field.clone(),
            id_param: settings.id_param.clone(),
        }
    }

    /// Endpoint with the id query parameter appended (percent-encoded).
    pub fn upload_url(&self, id: &str) -> Result<String, TransportError> {
        let mut url = url::Url::parse(&self.endpoint)?;
        url.query_pairs_mut().append_pair(&self.id_param, id);
        Ok(url.into())
    }
}

impl UploadTransport for MediaServer {
    fn send(&self, file: &Path, id: &str) -> Result<Vec<u8>, TransportError> {
        let url = self.upload_url(id)?;
        self.http.post_file(
            &url,
            std::slice::from_ref(&self.auth_header),
            &self.file_field,
            file,
        )
    }
}

/// Destination answer for a successful upload.
#[derive(Debug, Clone)]
pub struct UploadReceipt {
    pub bytes: u64,
    /// Parsed JSON body, when the server sent JSON.
    pub response: Option<Value>,
}

pub struct Uploader<T> {
    transport: T,
    transient_dir: PathBuf,
}

impl<T: UploadTransport> Uploader<T> {
    pub fn new(transport: T, transient_dir: impl Into<PathBuf>) -> Self {
        Self {
            transport,
            transient_dir: transient_dir.into(),
        }
    }

    /// Upload `asset` through a transient copy named after its original filename.
    pub fn transfer(&self, asset: &StagedAsset) -> Result<UploadReceipt, MigrationError> {
        let fail = |e: TransportError| MigrationError::transfer(&asset.id, e);

        fs::create_dir_all(&self.transient_dir).map_err(|e| fail(e.into()))?;
        let work = tempfile::Builder::new()
            .prefix("imgmig-upload-")
            .tempdir_in(&self.transient_dir)
            .map_err(|e| fail(e.into()))?;
        let copy = work.path().join(&asset.filename);

        let result = fs::copy(&asset.path, &copy)
            .map_err(TransportError::from)
            .and_then(|bytes| {
                self.transport
                    .send(&copy, &asset.id)
                    .map(|body| (bytes, body))
            });

        let work_path = work.path().to_path_buf();
        if let Err(e) = work.close() {
            tracing::warn!("could not remove transient copy {}: {}", work_path.display(), e);
        }

        let (bytes, body) = result.map_err(fail)?;
        let response = serde_json::from_slice::<Value>(&body).ok();
        match &response {
            Some(v) => tracing::info!("{} - {} uploaded: {}", asset.date, asset.id, v),
            None => tracing::info!("{} - {} uploaded ({} byte non-JSON response)", asset.date, asset.id, body.len()),
        }
        Ok(UploadReceipt { bytes, response })
    }
}
