//! Moving one file from the Zotero file store onto the tablet.
//!
//! A transfer is a buffered download followed by a single multipart upload to
//! the tablet's USB web interface. Nothing is verified after the upload; the
//! tablet ingests the file asynchronously.

use async_trait::async_trait;
use reqwest::header::{HeaderValue, ACCEPT, CONNECTION};
use reqwest::multipart::{Form, Part};
use tracing::{debug, info, instrument};

use crate::config::SyncConfig;
use crate::errors::TransferError;
use crate::models::FileToTransfer;

/// Name of the multipart field the tablet reads the file from.
pub const UPLOAD_FIELD_NAME: &str = "file";

/// Content type declared on the uploaded part.
pub const UPLOAD_PART_CONTENT_TYPE: &str = "application/octet-stream";

/// Fetches the bytes behind a download URL.
#[async_trait]
pub trait FileSource: Send + Sync {
    async fn download(&self, url: &str) -> Result<Vec<u8>, TransferError>;
}

/// Hands a file to the tablet for ingestion.
#[async_trait]
pub trait IngestSink: Send + Sync {
    async fn ingest(&self, filename: &str, bytes: Vec<u8>) -> Result<(), TransferError>;
}

/// Outcome of a completed transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferReceipt {
    pub bytes: u64,
}

// ---------------------------------------------------------------------------
// HTTP implementations
// ---------------------------------------------------------------------------

/// Plain GET download, whole body buffered in memory.
#[derive(Clone)]
pub struct HttpFileSource {
    http: reqwest::Client,
}

impl HttpFileSource {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl FileSource for HttpFileSource {
    async fn download(&self, url: &str) -> Result<Vec<u8>, TransferError> {
        let download_err = |source| TransferError::Download {
            url: url.to_string(),
            source,
        };

        let resp = self.http.get(url).send().await.map_err(download_err)?;
        let status = resp.status();
        if !status.is_success() {
            return Err(TransferError::DownloadStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let body = resp.bytes().await.map_err(download_err)?;
        debug!(url, bytes = body.len(), "downloaded file");
        Ok(body.to_vec())
    }
}

/// Multipart uploader for the tablet's `/upload` endpoint.
#[derive(Clone)]
pub struct TabletUploader {
    http: reqwest::Client,
    upload_url: String,
}

impl TabletUploader {
    pub fn new(http: reqwest::Client, upload_url: impl Into<String>) -> Self {
        Self {
            http,
            upload_url: upload_url.into(),
        }
    }

    pub fn upload_url(&self) -> &str {
        &self.upload_url
    }
}

#[async_trait]
impl IngestSink for TabletUploader {
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    async fn ingest(&self, filename: &str, bytes: Vec<u8>) -> Result<(), TransferError> {
        let upload_err = |source| TransferError::Upload {
            filename: filename.to_string(),
            source,
        };

        let part = Part::bytes(bytes)
            .file_name(filename.to_string())
            .mime_str(UPLOAD_PART_CONTENT_TYPE)
            .map_err(upload_err)?;
        let form = Form::new().part(UPLOAD_FIELD_NAME, part);

        let resp = self
            .http
            .post(&self.upload_url)
            .header(ACCEPT, HeaderValue::from_static("*/*"))
            .header(CONNECTION, HeaderValue::from_static("keep-alive"))
            .multipart(form)
            .send()
            .await
            .map_err(upload_err)?;

        let status = resp.status();
        if !status.is_success() {
            return Err(TransferError::UploadStatus {
                filename: filename.to_string(),
                status: status.as_u16(),
            });
        }
        debug!(filename, status = status.as_u16(), "uploaded file");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Transferor
// ---------------------------------------------------------------------------

/// Download-then-upload of a single planned file.
pub struct Transferor<S, K> {
    source: S,
    sink: K,
}

impl<S: FileSource, K: IngestSink> Transferor<S, K> {
    pub fn new(source: S, sink: K) -> Self {
        Self { source, sink }
    }

    pub async fn transfer(&self, file: &FileToTransfer) -> Result<TransferReceipt, TransferError> {
        info!(url = %file.source_url, filename = %file.filename, "downloading");
        let bytes = self.source.download(&file.source_url).await?;
        let size = bytes.len() as u64;
        self.sink.ingest(&file.filename, bytes).await?;
        Ok(TransferReceipt { bytes: size })
    }
}

/// The HTTP-backed transferor described by `config`, sharing `http`.
pub fn http_transferor(
    http: reqwest::Client,
    config: &SyncConfig,
) -> Transferor<HttpFileSource, TabletUploader> {
    Transferor::new(
        HttpFileSource::new(http.clone()),
        TabletUploader::new(http, config.tablet.upload_url.clone()),
    )
}
